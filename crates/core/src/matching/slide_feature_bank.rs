use std::sync::OnceLock;

use rayon::prelude::*;

use crate::matching::domain::detector_kind::DetectorKind;
use crate::matching::domain::feature_extractor::FeatureExtractor;
use crate::matching::domain::feature_set::{FeatureSet, SlideFeatureSet};
use crate::slides::domain::slide::Slide;

/// Per-detector slide features, extracted at most once per run.
///
/// A detector family's sets are computed the first time a frame needs them,
/// in parallel across slides, then shared read-only. Families the escalation
/// never reaches cost nothing.
pub struct SlideFeatureBank<'a> {
    slides: &'a [Slide],
    extractor: &'a dyn FeatureExtractor,
    orb: OnceLock<Vec<SlideFeatureSet>>,
    brisk: OnceLock<Vec<SlideFeatureSet>>,
    sift: OnceLock<Vec<SlideFeatureSet>>,
}

impl<'a> SlideFeatureBank<'a> {
    pub fn new(slides: &'a [Slide], extractor: &'a dyn FeatureExtractor) -> Self {
        Self {
            slides,
            extractor,
            orb: OnceLock::new(),
            brisk: OnceLock::new(),
            sift: OnceLock::new(),
        }
    }

    pub fn get(&self, kind: DetectorKind) -> &[SlideFeatureSet] {
        self.cell(kind).get_or_init(|| self.extract_all(kind))
    }

    #[cfg(test)]
    fn is_computed(&self, kind: DetectorKind) -> bool {
        self.cell(kind).get().is_some()
    }

    fn cell(&self, kind: DetectorKind) -> &OnceLock<Vec<SlideFeatureSet>> {
        match kind {
            DetectorKind::Orb => &self.orb,
            DetectorKind::Brisk => &self.brisk,
            DetectorKind::Sift => &self.sift,
        }
    }

    fn extract_all(&self, kind: DetectorKind) -> Vec<SlideFeatureSet> {
        let sets: Vec<SlideFeatureSet> = self
            .slides
            .par_iter()
            .map(|slide| {
                let features = self
                    .extractor
                    .extract(&slide.image, kind)
                    .unwrap_or_else(|e| {
                        log::warn!("{kind} extraction failed for slide {}: {e}", slide.index);
                        FeatureSet::empty(kind)
                    });
                SlideFeatureSet {
                    slide_index: slide.index,
                    features,
                }
            })
            .collect();
        log::debug!(
            "Extracted {kind} features for {} slides ({} descriptors total)",
            sets.len(),
            sets.iter().map(|s| s.features.len()).sum::<usize>()
        );
        sets
    }
}
