use std::cmp::Ordering;

use serde::Serialize;

/// Best slide for one frame, with a confidence in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchScore {
    pub slide_index: usize,
    pub confidence: f64,
}

impl MatchScore {
    pub fn new(slide_index: usize, confidence: f64) -> Self {
        Self {
            slide_index,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Total order used to pick winners: higher confidence first, then the
    /// lower slide index, so equal scores resolve the same way every run.
    pub fn rank(&self, other: &Self) -> Ordering {
        self.confidence
            .total_cmp(&other.confidence)
            .then_with(|| other.slide_index.cmp(&self.slide_index))
    }

    /// Returns whichever of `current` and `candidate` ranks higher.
    pub fn better(current: Option<Self>, candidate: Option<Self>) -> Option<Self> {
        match (current, candidate) {
            (Some(a), Some(b)) => Some(if b.rank(&a) == Ordering::Greater { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Replaces `current` only when `candidate` scores strictly higher.
    pub fn strictly_better(current: Option<Self>, candidate: Option<Self>) -> Option<Self> {
        match (current, candidate) {
            (Some(a), Some(b)) if b.confidence > a.confidence => Some(b),
            (None, b) => b,
            (a, _) => a,
        }
    }
}

/// Weights for combining inlier ratio and match ratio into a confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfidenceWeights {
    pub inlier: f64,
    pub matches: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            inlier: 0.7,
            matches: 0.3,
        }
    }
}

impl ConfidenceWeights {
    /// `inlier * inliers/correspondences + matches * correspondences/min(keypoints)`.
    pub fn combine(
        &self,
        inliers: usize,
        correspondences: usize,
        keypoints_a: usize,
        keypoints_b: usize,
    ) -> f64 {
        let fewest = keypoints_a.min(keypoints_b);
        if correspondences == 0 || fewest == 0 {
            return 0.0;
        }
        let inlier_ratio = inliers as f64 / correspondences as f64;
        let match_ratio = (correspondences as f64 / fewest as f64).min(1.0);
        (self.inlier * inlier_ratio + self.matches * match_ratio).clamp(0.0, 1.0)
    }
}
