use serde::Serialize;

/// From `time` (seconds) onward, slide `slide_index` is on screen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub time: f64,
    pub slide_index: usize,
}

impl TimelineEntry {
    pub fn new(time: f64, slide_index: usize) -> Self {
        Self { time, slide_index }
    }
}

/// How a timeline came to be. Estimated and uniform timelines are guesses and
/// must not be reported as detections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineSource {
    /// Built from slides recognized in video frames.
    Detected,
    /// Slides spread evenly over the transcript duration.
    Estimated,
    /// Last-resort bucketing after an internal failure.
    Uniform,
}

/// Step function from time to slide index.
///
/// Entries are kept sorted by time and the first one sits at `t = 0`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// A timeline whose only entry puts `slide_index` at the origin.
    pub fn starting_with(slide_index: usize) -> Self {
        Self {
            entries: vec![TimelineEntry::new(0.0, slide_index)],
        }
    }

    /// Sorts `entries` by time; ties keep their given order.
    pub fn from_entries(mut entries: Vec<TimelineEntry>) -> Self {
        entries.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { entries }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a change point. `time` must not precede the last entry.
    pub fn push(&mut self, time: f64, slide_index: usize) {
        debug_assert!(
            self.entries.last().map_or(true, |last| last.time <= time),
            "timeline entries must be appended in time order"
        );
        self.entries.push(TimelineEntry::new(time, slide_index));
    }

    /// Replaces the slide shown at the origin.
    pub fn set_initial_slide(&mut self, slide_index: usize) {
        match self.entries.first_mut() {
            Some(first) => first.slide_index = slide_index,
            None => self.entries.push(TimelineEntry::new(0.0, slide_index)),
        }
    }

    /// Slide of the last entry at or before `time`. Times before the first
    /// entry get the first entry's slide; an empty timeline answers 0.
    pub fn slide_at(&self, time: f64) -> usize {
        let Some(first) = self.entries.first() else {
            return 0;
        };
        self.entries
            .iter()
            .take_while(|e| e.time <= time)
            .last()
            .unwrap_or(first)
            .slide_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lecture() -> Timeline {
        Timeline::from_entries(vec![
            TimelineEntry::new(0.0, 0),
            TimelineEntry::new(50.0, 1),
            TimelineEntry::new(120.0, 2),
        ])
    }

    #[rstest]
    #[case::between_changes(75.0, 1)]
    #[case::before_first_change(10.0, 0)]
    #[case::after_last_change(200.0, 2)]
    #[case::exactly_on_change(50.0, 1)]
    #[case::origin(0.0, 0)]
    fn test_slide_at(#[case] time: f64, #[case] expected: usize) {
        assert_eq!(lecture().slide_at(time), expected);
    }

    #[test]
    fn test_empty_timeline_answers_zero() {
        assert_eq!(Timeline::default().slide_at(42.0), 0);
    }

    #[test]
    fn test_time_before_first_entry_uses_first_slide() {
        let timeline = Timeline::from_entries(vec![TimelineEntry::new(10.0, 3)]);
        assert_eq!(timeline.slide_at(-1.0), 3);
        assert_eq!(timeline.slide_at(5.0), 3);
    }

    #[test]
    fn test_from_entries_sorts() {
        let timeline = Timeline::from_entries(vec![
            TimelineEntry::new(30.0, 2),
            TimelineEntry::new(0.0, 0),
            TimelineEntry::new(10.0, 1),
        ]);
        let times: Vec<f64> = timeline.entries().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 10.0, 30.0]);
    }

    #[test]
    fn test_set_initial_slide() {
        let mut timeline = Timeline::starting_with(0);
        timeline.set_initial_slide(4);
        assert_eq!(timeline.entries(), &[TimelineEntry::new(0.0, 4)]);

        let mut empty = Timeline::default();
        empty.set_initial_slide(2);
        assert_eq!(empty.entries(), &[TimelineEntry::new(0.0, 2)]);
    }

    #[test]
    fn test_serializes_as_entry_list() {
        let json = serde_json::to_value(Timeline::starting_with(1)).unwrap();
        assert_eq!(json, serde_json::json!([{"time": 0.0, "slide_index": 1}]));
    }
}
