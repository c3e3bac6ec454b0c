use super::descriptor_matcher::Correspondence;
use super::feature_set::Keypoint;
use super::matching_error::MatchingError;
use crate::shared::constants::MIN_CORRESPONDENCES;

/// Smallest and largest area scale a slide can plausibly undergo between
/// the rendered image and a camera frame.
const MIN_AREA_SCALE: f64 = 0.01;
const MAX_AREA_SCALE: f64 = 100.0;

/// Perspective terms beyond this describe a plane seen almost edge-on.
const MAX_PERSPECTIVE: f64 = 0.01;

/// Row-major 3x3 planar transform plus the estimator's inlier mask.
#[derive(Clone, Debug, PartialEq)]
pub struct Homography {
    pub matrix: [f64; 9],
    pub inlier_mask: Vec<bool>,
}

impl Homography {
    pub fn inliers(&self) -> usize {
        self.inlier_mask.iter().filter(|&&m| m).count()
    }

    /// Rejects transforms no real camera shot of a flat slide would produce:
    /// non-finite entries, mirrored or collapsed mappings, extreme scale and
    /// extreme perspective.
    pub fn is_plausible(&self) -> bool {
        let m = &self.matrix;
        if m.iter().any(|v| !v.is_finite()) || m[8].abs() < 1e-12 {
            return false;
        }
        let n: Vec<f64> = m.iter().map(|v| v / m[8]).collect();
        let det = n[0] * n[4] - n[1] * n[3];
        if !(MIN_AREA_SCALE..=MAX_AREA_SCALE).contains(&det) {
            return false;
        }
        n[6].abs() <= MAX_PERSPECTIVE && n[7].abs() <= MAX_PERSPECTIVE
    }
}

/// Robust homography estimation (RANSAC or similar).
pub trait HomographyEstimator: Send + Sync {
    /// Maps `src[i]` onto `dst[i]`. Returns `None` when the configuration is
    /// degenerate and no transform could be fitted.
    fn estimate(
        &self,
        src: &[Keypoint],
        dst: &[Keypoint],
        reprojection_threshold: f64,
    ) -> Result<Option<Homography>, MatchingError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verification {
    pub inliers: usize,
    pub correspondences: usize,
    pub ok: bool,
}

impl Verification {
    fn rejected(correspondences: usize) -> Self {
        Self {
            inliers: 0,
            correspondences,
            ok: false,
        }
    }
}

/// Checks that ratio-test survivors agree on one planar transform.
pub struct GeometricVerifier<'a> {
    estimator: &'a dyn HomographyEstimator,
    reprojection_threshold: f64,
    min_inliers: usize,
}

impl<'a> GeometricVerifier<'a> {
    pub fn new(
        estimator: &'a dyn HomographyEstimator,
        reprojection_threshold: f64,
        min_inliers: usize,
    ) -> Self {
        Self {
            estimator,
            reprojection_threshold,
            min_inliers,
        }
    }

    /// `query_keypoints` belong to the frame, `train_keypoints` to the slide.
    pub fn verify(
        &self,
        correspondences: &[Correspondence],
        query_keypoints: &[Keypoint],
        train_keypoints: &[Keypoint],
    ) -> Verification {
        let count = correspondences.len();
        if count < MIN_CORRESPONDENCES {
            return Verification::rejected(count);
        }

        let mut src = Vec::with_capacity(count);
        let mut dst = Vec::with_capacity(count);
        for c in correspondences {
            match (train_keypoints.get(c.train_idx), query_keypoints.get(c.query_idx)) {
                (Some(s), Some(d)) => {
                    src.push(*s);
                    dst.push(*d);
                }
                _ => return Verification::rejected(count),
            }
        }

        let homography = match self.estimator.estimate(&src, &dst, self.reprojection_threshold) {
            Ok(Some(h)) => h,
            Ok(None) => return Verification::rejected(count),
            Err(e) => {
                log::debug!("Homography estimation failed: {e}");
                return Verification::rejected(count);
            }
        };
        if !homography.is_plausible() {
            return Verification::rejected(count);
        }

        let inliers = homography.inliers();
        Verification {
            inliers,
            correspondences: count,
            ok: inliers >= self.min_inliers,
        }
    }
}
