use crate::matching::domain::descriptor_matcher::{DescriptorMatcher, HammingNeighbors};
use crate::matching::domain::template_matcher::TemplateMatcher;
use crate::matching::slide_match_scorer::MatchingComponents;
use crate::shared::config::MatchingConfig;
use crate::shared::constants::TEMPLATE_WORKING_WIDTH;

use super::flann_neighbors::FlannNeighbors;
use super::opencv_feature_extractor::OpencvFeatureExtractor;
use super::opencv_template_matcher::OpencvTemplateMatcher;
use super::ransac_homography::RansacHomography;

/// Wires the OpenCV-backed implementations of every matching port.
///
/// Binary descriptors use the exhaustive Hamming search; float descriptors go
/// through FLANN. The template matcher is left out when the fallback is
/// disabled in `config`.
pub fn opencv_components(config: &MatchingConfig) -> MatchingComponents {
    let detectors = config.available_detectors();
    log::info!(
        "Matching with detectors [{}] (template fallback {})",
        detectors
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        if config.enable_template_fallback { "on" } else { "off" }
    );

    MatchingComponents {
        extractor: Box::new(OpencvFeatureExtractor::new(
            config.orb_features,
            config.max_image_dimension,
        )),
        matcher: DescriptorMatcher::new(Box::new(HammingNeighbors), Box::new(FlannNeighbors)),
        estimator: Box::new(RansacHomography),
        template: config.enable_template_fallback.then(|| {
            Box::new(OpencvTemplateMatcher::new(
                config.template_scales.clone(),
                config.template_attenuation,
                TEMPLATE_WORKING_WIDTH,
            )) as Box<dyn TemplateMatcher>
        }),
    }
}
