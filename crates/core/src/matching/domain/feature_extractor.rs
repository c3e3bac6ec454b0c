use image::GrayImage;

use super::detector_kind::DetectorKind;
use super::feature_set::FeatureSet;
use super::matching_error::MatchingError;

/// Computes keypoints and descriptors for a single grayscale image.
///
/// Implementations apply the shared preprocessing themselves so slides and
/// frames always go through the identical path. Must be shareable across
/// threads: slide features are extracted in parallel.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: &GrayImage, kind: DetectorKind) -> Result<FeatureSet, MatchingError>;
}
