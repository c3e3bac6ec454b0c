use std::collections::BTreeMap;

use crate::timeline::domain::timeline::Timeline;
use crate::transcript::domain::transcript_segment::{max_end_time, TranscriptSegment};

/// Labels every segment with the slide the timeline shows at its start time.
///
/// Indices are clamped into `[0, num_slides)` so a timeline that references a
/// slide that failed to decode cannot leak an out-of-range index. With no
/// slides every segment gets 0.
pub fn assign_segments(
    segments: &[TranscriptSegment],
    timeline: &Timeline,
    num_slides: usize,
) -> Vec<TranscriptSegment> {
    segments
        .iter()
        .map(|segment| segment.annotated(clamp(timeline.slide_at(segment.start_time), num_slides)))
        .collect()
}

/// Buckets segments by start time into equal slices of the transcript.
/// Needs no timeline at all, so it is what is left when everything else has
/// failed.
pub fn assign_uniform(segments: &[TranscriptSegment], num_slides: usize) -> Vec<TranscriptSegment> {
    if num_slides == 0 {
        return segments.iter().map(|s| s.annotated(0)).collect();
    }
    let per_slide = max_end_time(segments).unwrap_or(0.0) / num_slides as f64;
    segments
        .iter()
        .map(|segment| {
            let bucket = if per_slide > 0.0 && segment.start_time.is_finite() && segment.start_time > 0.0 {
                (segment.start_time / per_slide).floor() as usize
            } else {
                0
            };
            segment.annotated(bucket.min(num_slides - 1))
        })
        .collect()
}

/// Segment count per slide, for logging and reporting.
pub fn slide_distribution(segments: &[TranscriptSegment]) -> BTreeMap<usize, usize> {
    let mut distribution = BTreeMap::new();
    for index in segments.iter().filter_map(|s| s.slide_index) {
        *distribution.entry(index).or_insert(0) += 1;
    }
    distribution
}

fn clamp(index: usize, num_slides: usize) -> usize {
    index.min(num_slides.saturating_sub(1))
}
