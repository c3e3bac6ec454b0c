use opencv::calib3d;
use opencv::core::Mat;
use opencv::prelude::*;

use super::mat_convert::keypoints_to_points;
use crate::matching::domain::feature_set::Keypoint;
use crate::matching::domain::geometric_verifier::{Homography, HomographyEstimator};
use crate::matching::domain::matching_error::MatchingError;
use crate::shared::constants::MIN_CORRESPONDENCES;

/// `cv::findHomography` with RANSAC. OpenCV seeds its RNG the same way on
/// every call, so results are repeatable for identical input.
pub struct RansacHomography;

impl HomographyEstimator for RansacHomography {
    fn estimate(
        &self,
        src: &[Keypoint],
        dst: &[Keypoint],
        reprojection_threshold: f64,
    ) -> Result<Option<Homography>, MatchingError> {
        if src.len() < MIN_CORRESPONDENCES || src.len() != dst.len() {
            return Ok(None);
        }
        let src_points = keypoints_to_points(src);
        let dst_points = keypoints_to_points(dst);
        let mut mask = Mat::default();
        let h = calib3d::find_homography(
            &src_points,
            &dst_points,
            &mut mask,
            calib3d::RANSAC,
            reprojection_threshold,
        )?;
        if h.empty() || h.rows() != 3 || h.cols() != 3 {
            return Ok(None);
        }

        let mut matrix = [0.0f64; 9];
        for r in 0..3 {
            for c in 0..3 {
                matrix[r * 3 + c] = *h.at_2d::<f64>(r as i32, c as i32)?;
            }
        }
        let inlier_mask = if mask.empty() {
            vec![false; src.len()]
        } else {
            mask.data_bytes()?.iter().map(|&m| m != 0).collect()
        };
        Ok(Some(Homography {
            matrix,
            inlier_mask,
        }))
    }
}
