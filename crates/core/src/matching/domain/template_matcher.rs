use image::GrayImage;

use super::match_score::MatchScore;
use super::matching_error::MatchingError;
use crate::slides::domain::slide::Slide;

/// Whole-image correlation fallback for frames where feature matching is
/// inconclusive.
///
/// The returned confidence is already attenuated so it can be compared
/// directly against feature-based confidences.
pub trait TemplateMatcher: Send + Sync {
    fn best_match(&self, frame: &GrayImage, slides: &[Slide]) -> Result<Option<MatchScore>, MatchingError>;
}
