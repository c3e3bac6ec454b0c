use crate::timeline::domain::timeline::{Timeline, TimelineEntry};
use crate::transcript::domain::transcript_segment::{max_end_time, TranscriptSegment};

/// Spreads `num_slides` evenly over the transcript's duration.
///
/// A guess for when no frames could be analysed, or analysis found no slide
/// changes. The duration is the largest valid `end_time`, or
/// `placeholder_duration` when no segment has one.
pub fn estimate_timeline(
    segments: &[TranscriptSegment],
    num_slides: usize,
    placeholder_duration: f64,
) -> Timeline {
    if segments.is_empty() || num_slides <= 1 {
        return Timeline::starting_with(0);
    }
    let duration = max_end_time(segments).unwrap_or(placeholder_duration);
    let per_slide = duration / num_slides as f64;
    log::info!(
        "Estimating timeline over {duration:.2}s for {num_slides} slides ({per_slide:.2}s each)"
    );
    Timeline::from_entries(
        (0..num_slides)
            .map(|i| TimelineEntry::new(i as f64 * per_slide, i))
            .collect(),
    )
}
