use image::GrayImage;

use super::match_score::MatchScore;

/// Picks the slide shown in a frame, or `None` when nothing matches
/// confidently enough.
pub trait FrameScorer {
    fn score_frame(&self, frame: &GrayImage) -> Option<MatchScore>;
}
