use image::GrayImage;
use rayon::prelude::*;

use crate::matching::domain::descriptor_matcher::DescriptorMatcher;
use crate::matching::domain::detector_kind::DetectorKind;
use crate::matching::domain::feature_extractor::FeatureExtractor;
use crate::matching::domain::feature_set::{FeatureSet, SlideFeatureSet};
use crate::matching::domain::frame_scorer::FrameScorer;
use crate::matching::domain::geometric_verifier::{GeometricVerifier, HomographyEstimator};
use crate::matching::domain::match_score::{ConfidenceWeights, MatchScore};
use crate::matching::domain::template_matcher::TemplateMatcher;
use crate::matching::slide_feature_bank::SlideFeatureBank;
use crate::shared::config::MatchingConfig;
use crate::shared::constants::MIN_CORRESPONDENCES;
use crate::slides::domain::slide::Slide;

/// The ports a scorer needs, bundled so they can be built once per run.
pub struct MatchingComponents {
    pub extractor: Box<dyn FeatureExtractor>,
    pub matcher: DescriptorMatcher,
    pub estimator: Box<dyn HomographyEstimator>,
    pub template: Option<Box<dyn TemplateMatcher>>,
}

/// Decides which slide a frame shows.
///
/// Runs the whole per-slide sweep with the cheapest detector first and
/// escalates to denser ones only while the best confidence stays under
/// `min_confidence`. When every family falls short, whole-image template
/// correlation gets the last word.
pub struct SlideMatchScorer<'a> {
    slides: &'a [Slide],
    bank: SlideFeatureBank<'a>,
    components: &'a MatchingComponents,
    verifier: GeometricVerifier<'a>,
    weights: ConfidenceWeights,
    detectors: Vec<DetectorKind>,
    config: &'a MatchingConfig,
}

impl<'a> SlideMatchScorer<'a> {
    pub fn new(
        slides: &'a [Slide],
        components: &'a MatchingComponents,
        config: &'a MatchingConfig,
    ) -> Self {
        Self {
            slides,
            bank: SlideFeatureBank::new(slides, components.extractor.as_ref()),
            components,
            verifier: GeometricVerifier::new(
                components.estimator.as_ref(),
                config.reprojection_threshold,
                config.min_inliers,
            ),
            weights: ConfidenceWeights {
                inlier: config.inlier_weight,
                matches: config.match_weight,
            },
            detectors: config.available_detectors(),
            config,
        }
    }

    fn clears_floor(&self, score: Option<MatchScore>) -> bool {
        score.is_some_and(|s| s.confidence > 0.0 && s.confidence >= self.config.min_confidence)
    }

    /// Best slide for one detector family, ties going to the lower index.
    fn sweep(&self, kind: DetectorKind, frame: &GrayImage) -> Option<MatchScore> {
        let frame_features = match self.components.extractor.extract(frame, kind) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("{kind} extraction failed on frame: {e}");
                return None;
            }
        };
        if frame_features.len() < self.config.min_descriptors {
            return None;
        }
        self.bank
            .get(kind)
            .par_iter()
            .map(|slide| self.score_slide(&frame_features, slide))
            .reduce(|| None, MatchScore::better)
    }

    fn score_slide(&self, frame: &FeatureSet, slide: &SlideFeatureSet) -> Option<MatchScore> {
        if slide.features.len() < self.config.min_descriptors {
            return None;
        }
        let ratio = self.config.ratio_for(frame.detector);
        let correspondences = match self.components.matcher.match_features(frame, &slide.features, ratio) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Matching against slide {} failed: {e}", slide.slide_index);
                return None;
            }
        };
        if correspondences.len() < MIN_CORRESPONDENCES {
            return None;
        }
        let verification =
            self.verifier
                .verify(&correspondences, &frame.keypoints, &slide.features.keypoints);
        if !verification.ok {
            return None;
        }
        let confidence = self.weights.combine(
            verification.inliers,
            verification.correspondences,
            frame.len(),
            slide.features.len(),
        );
        Some(MatchScore::new(slide.slide_index, confidence))
    }

    fn template_fallback(&self, frame: &GrayImage) -> Option<MatchScore> {
        let template = self.components.template.as_ref()?;
        template.best_match(frame, self.slides).unwrap_or_else(|e| {
            log::debug!("Template fallback failed: {e}");
            None
        })
    }
}

impl FrameScorer for SlideMatchScorer<'_> {
    fn score_frame(&self, frame: &GrayImage) -> Option<MatchScore> {
        if self.slides.is_empty() {
            return None;
        }
        let mut best: Option<MatchScore> = None;
        for &kind in &self.detectors {
            best = MatchScore::strictly_better(best, self.sweep(kind, frame));
            if self.clears_floor(best) {
                return best;
            }
            log::trace!("{kind} inconclusive ({best:?}), escalating");
        }

        best = MatchScore::strictly_better(best, self.template_fallback(frame));
        if self.clears_floor(best) {
            best
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::domain::descriptor_matcher::{HammingNeighbors, NearestNeighbors, Neighbor};
    use crate::matching::domain::feature_set::{Descriptors, Keypoint};
    use crate::matching::domain::geometric_verifier::Homography;
    use crate::matching::domain::matching_error::MatchingError;
    use crate::test_support::uniform_image;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    const SLIDE_SIZE: u32 = 16;
    const FRAME_SIZE: u32 = 32;
    const ROWS: usize = 24;

    /// Encodes the image's fill value into both descriptors and keypoint
    /// positions, so a frame filled with the same value as a slide matches
    /// it row for row. Families listed in `blind` see nothing.
    struct FakeExtractor {
        blind: Vec<DetectorKind>,
        frame_calls: Arc<Mutex<Vec<DetectorKind>>>,
        frame_rows: usize,
        slide_rows: usize,
    }

    impl FakeExtractor {
        fn new(blind: &[DetectorKind]) -> Self {
            Self {
                blind: blind.to_vec(),
                frame_calls: Arc::new(Mutex::new(Vec::new())),
                frame_rows: ROWS,
                slide_rows: ROWS,
            }
        }

        fn with_rows(frame_rows: usize, slide_rows: usize) -> Self {
            Self {
                frame_rows,
                slide_rows,
                ..Self::new(&[])
            }
        }
    }

    impl FeatureExtractor for FakeExtractor {
        fn extract(&self, image: &GrayImage, kind: DetectorKind) -> Result<FeatureSet, MatchingError> {
            let rows = if image.width() == FRAME_SIZE {
                self.frame_calls.lock().unwrap().push(kind);
                self.frame_rows
            } else {
                self.slide_rows
            };
            let value = image.get_pixel(0, 0).0[0];
            if self.blind.contains(&kind) || value == 0 {
                return Ok(FeatureSet::empty(kind));
            }
            let keypoints = (0..rows)
                .map(|j| Keypoint::new(j as f32 * 5.0 + value as f32, (j % 4) as f32 * 3.0))
                .collect();
            let mut data = Vec::with_capacity(rows * 2);
            for j in 0..rows {
                data.push(value);
                data.push(j as u8);
            }
            let descriptors = if kind.is_binary() {
                Descriptors::Binary { width: 2, data }
            } else {
                Descriptors::Float {
                    dim: 2,
                    data: data.into_iter().map(f32::from).collect(),
                }
            };
            Ok(FeatureSet::new(kind, keypoints, descriptors))
        }
    }

    /// Brute-force L1 stand-in for FLANN.
    struct FakeFloatNeighbors;

    impl NearestNeighbors for FakeFloatNeighbors {
        fn knn2(&self, query: &Descriptors, train: &Descriptors) -> Result<Vec<Vec<Neighbor>>, MatchingError> {
            let (Descriptors::Float { dim, data: q }, Descriptors::Float { data: t, .. }) = (query, train)
            else {
                return Err(MatchingError::Other("float only".into()));
            };
            Ok(q.chunks(*dim)
                .map(|qr| {
                    let mut all: Vec<Neighbor> = t
                        .chunks(*dim)
                        .enumerate()
                        .map(|(i, tr)| Neighbor {
                            train_idx: i,
                            distance: qr.iter().zip(tr).map(|(a, b)| (a - b).abs()).sum(),
                        })
                        .collect();
                    all.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                    all.truncate(2);
                    all
                })
                .collect())
        }
    }

    /// Identity transform whose inliers are the pairs that already coincide.
    struct CoincidenceEstimator;

    impl HomographyEstimator for CoincidenceEstimator {
        fn estimate(
            &self,
            src: &[Keypoint],
            dst: &[Keypoint],
            _threshold: f64,
        ) -> Result<Option<Homography>, MatchingError> {
            Ok(Some(Homography {
                matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                inlier_mask: src.iter().zip(dst).map(|(s, d)| s == d).collect(),
            }))
        }
    }

    struct FixedTemplate(Option<MatchScore>);

    impl TemplateMatcher for FixedTemplate {
        fn best_match(&self, _frame: &GrayImage, _slides: &[Slide]) -> Result<Option<MatchScore>, MatchingError> {
            Ok(self.0)
        }
    }

    fn components(extractor: FakeExtractor, template: Option<MatchScore>) -> MatchingComponents {
        MatchingComponents {
            extractor: Box::new(extractor),
            matcher: DescriptorMatcher::new(Box::new(HammingNeighbors), Box::new(FakeFloatNeighbors)),
            estimator: Box::new(CoincidenceEstimator),
            template: Some(Box::new(FixedTemplate(template))),
        }
    }

    fn deck(values: &[u8]) -> Vec<Slide> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Slide::new(i, uniform_image(SLIDE_SIZE, SLIDE_SIZE, v)))
            .collect()
    }

    fn frame(value: u8) -> GrayImage {
        uniform_image(FRAME_SIZE, FRAME_SIZE, value)
    }

    #[test]
    fn test_matching_slide_found_by_cheapest_detector() {
        let slides = deck(&[10, 40, 90]);
        let extractor = FakeExtractor::new(&[]);
        let calls = Arc::clone(&extractor.frame_calls);
        let components = components(extractor, None);
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);

        let best = scorer.score_frame(&frame(40)).unwrap();
        assert_eq!(best.slide_index, 1);
        assert!(best.confidence > 0.9);
        assert_eq!(*calls.lock().unwrap(), vec![DetectorKind::Orb]);
    }

    #[test]
    fn test_escalates_when_cheap_detector_is_blind() {
        let slides = deck(&[10, 40, 90]);
        let extractor = FakeExtractor::new(&[DetectorKind::Orb]);
        let calls = Arc::clone(&extractor.frame_calls);
        let components = components(extractor, None);
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);

        let best = scorer.score_frame(&frame(90)).unwrap();
        assert_eq!(best.slide_index, 2);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![DetectorKind::Orb, DetectorKind::Brisk]
        );
    }

    #[test]
    fn test_float_family_reached_last() {
        let slides = deck(&[10, 40, 90]);
        let components = components(
            FakeExtractor::new(&[DetectorKind::Orb, DetectorKind::Brisk]),
            None,
        );
        let config = MatchingConfig {
            detectors: vec![DetectorKind::Orb, DetectorKind::Brisk, DetectorKind::Sift],
            ..Default::default()
        };
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        let best = scorer.score_frame(&frame(10));
        if DetectorKind::Sift.is_available() {
            assert_eq!(best.map(|b| b.slide_index), Some(0));
        } else {
            assert_eq!(best, None);
        }
    }

    #[test]
    fn test_template_fallback_when_all_detectors_fail() {
        let slides = deck(&[10, 40, 90]);
        let components = components(
            FakeExtractor::new(DetectorKind::ESCALATION),
            Some(MatchScore::new(2, 0.45)),
        );
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        assert_eq!(scorer.score_frame(&frame(40)), Some(MatchScore::new(2, 0.45)));
    }

    #[test]
    fn test_template_below_floor_is_no_match() {
        let slides = deck(&[10, 40]);
        let components = components(
            FakeExtractor::new(DetectorKind::ESCALATION),
            Some(MatchScore::new(1, 0.05)),
        );
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        assert_eq!(scorer.score_frame(&frame(40)), None);
    }

    #[test]
    fn test_without_template_no_match() {
        let slides = deck(&[10, 40]);
        let mut components = components(FakeExtractor::new(DetectorKind::ESCALATION), None);
        components.template = None;
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        assert_eq!(scorer.score_frame(&frame(40)), None);
    }

    #[test]
    fn test_identical_slides_resolve_to_lower_index() {
        let slides = deck(&[70, 20, 70, 70]);
        let components = components(FakeExtractor::new(&[]), None);
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        for _ in 0..5 {
            assert_eq!(scorer.score_frame(&frame(70)).unwrap().slide_index, 0);
        }
    }

    #[test]
    fn test_featureless_frame_falls_to_template() {
        let slides = deck(&[10, 40]);
        let components = components(FakeExtractor::new(&[]), Some(MatchScore::new(0, 0.3)));
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        assert_eq!(scorer.score_frame(&frame(0)), Some(MatchScore::new(0, 0.3)));
    }

    #[test]
    fn test_unrelated_frame_is_no_match() {
        let slides = deck(&[10, 40]);
        let components = components(FakeExtractor::new(&[]), None);
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&slides, &components, &config);
        assert_eq!(scorer.score_frame(&frame(200)), None);
    }

    #[rstest]
    #[case::frame_below_floor(9, ROWS, false)]
    #[case::frame_at_floor(10, ROWS, true)]
    #[case::slide_below_floor(ROWS, 9, false)]
    #[case::slide_at_floor(ROWS, 10, true)]
    fn test_descriptor_floor(
        #[case] frame_rows: usize,
        #[case] slide_rows: usize,
        #[case] matched: bool,
    ) {
        let slides = deck(&[10, 40]);
        let mut components = components(FakeExtractor::with_rows(frame_rows, slide_rows), None);
        components.template = None;
        let config = MatchingConfig {
            detectors: vec![DetectorKind::Orb],
            min_descriptors: 10,
            ..Default::default()
        };
        let scorer = SlideMatchScorer::new(&slides, &components, &config);

        let best = scorer.score_frame(&frame(40));
        if matched {
            assert_eq!(best.map(|b| b.slide_index), Some(1));
        } else {
            assert_eq!(best, None);
        }
    }

    #[test]
    fn test_empty_deck_is_no_match() {
        let components = components(FakeExtractor::new(&[]), Some(MatchScore::new(0, 0.9)));
        let config = MatchingConfig::default();
        let scorer = SlideMatchScorer::new(&[], &components, &config);
        assert_eq!(scorer.score_frame(&frame(10)), None);
    }
}
