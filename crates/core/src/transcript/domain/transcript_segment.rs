use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One span of recognized speech.
///
/// Fields this engine does not know about are carried through untouched so
/// the caller gets back exactly what it sent plus `slide_index`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(alias = "start")]
    pub start_time: f64,
    #[serde(alias = "end")]
    pub end_time: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_index: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TranscriptSegment {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
            confidence: 0.0,
            slide_index: None,
            extra: Map::new(),
        }
    }

    /// Copy of this segment labelled with `slide_index`.
    pub fn annotated(&self, slide_index: usize) -> Self {
        Self {
            slide_index: Some(slide_index),
            ..self.clone()
        }
    }
}

/// Largest finite, positive `end_time`, if any segment has one.
pub fn max_end_time(segments: &[TranscriptSegment]) -> Option<f64> {
    segments
        .iter()
        .map(|s| s.end_time)
        .filter(|t| t.is_finite() && *t > 0.0)
        .max_by(f64::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_short_names() {
        let segment: TranscriptSegment =
            serde_json::from_str(r#"{"start": 1.5, "end": 4.0, "text": "hello"}"#).unwrap();
        assert_eq!(segment.start_time, 1.5);
        assert_eq!(segment.end_time, 4.0);
        assert_eq!(segment.confidence, 0.0);
        assert_eq!(segment.slide_index, None);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = r#"{"start_time":0.0,"end_time":2.0,"text":"a","confidence":0.9,"speaker":"B"}"#;
        let segment: TranscriptSegment = serde_json::from_str(json).unwrap();
        assert_eq!(segment.extra.get("speaker"), Some(&Value::from("B")));
        let out = serde_json::to_value(segment.annotated(3)).unwrap();
        assert_eq!(out["speaker"], "B");
        assert_eq!(out["slide_index"], 3);
        assert_eq!(out["confidence"], 0.9);
    }

    #[test]
    fn test_annotated_leaves_original_untouched() {
        let segment = TranscriptSegment::new(1.0, 2.0, "x");
        let labelled = segment.annotated(2);
        assert_eq!(segment.slide_index, None);
        assert_eq!(labelled.slide_index, Some(2));
        assert_eq!(labelled.text, "x");
    }

    #[test]
    fn test_unlabelled_segment_omits_slide_index() {
        let out = serde_json::to_value(TranscriptSegment::new(0.0, 1.0, "")).unwrap();
        assert!(out.get("slide_index").is_none());
    }

    #[test]
    fn test_max_end_time_ignores_invalid() {
        let segments = vec![
            TranscriptSegment::new(0.0, f64::NAN, ""),
            TranscriptSegment::new(0.0, 120.0, ""),
            TranscriptSegment::new(0.0, -5.0, ""),
            TranscriptSegment::new(0.0, 80.0, ""),
        ];
        assert_eq!(max_end_time(&segments), Some(120.0));
        assert_eq!(max_end_time(&[TranscriptSegment::new(0.0, 0.0, "")]), None);
        assert_eq!(max_end_time(&[]), None);
    }
}
