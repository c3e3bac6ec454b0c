use image::GrayImage;
use opencv::core::{KeyPoint, Mat, Vector};
use opencv::features2d::{self, BRISK, ORB};
use opencv::prelude::*;

use super::mat_convert::{gray_to_mat, keypoints_from_cv, mat_to_descriptors};
use crate::matching::domain::detector_kind::DetectorKind;
use crate::matching::domain::feature_extractor::FeatureExtractor;
use crate::matching::domain::feature_set::FeatureSet;
use crate::matching::domain::matching_error::MatchingError;
use crate::matching::domain::preprocess::preprocess;

/// ORB, BRISK and (optionally) SIFT through OpenCV.
///
/// Detectors are created per call: OpenCV's algorithm objects are stateful
/// and not safe to share between rayon workers.
pub struct OpencvFeatureExtractor {
    orb_features: i32,
    max_dimension: u32,
}

impl OpencvFeatureExtractor {
    pub fn new(orb_features: i32, max_dimension: u32) -> Self {
        Self {
            orb_features,
            max_dimension,
        }
    }
}

impl FeatureExtractor for OpencvFeatureExtractor {
    fn extract(&self, image: &GrayImage, kind: DetectorKind) -> Result<FeatureSet, MatchingError> {
        let prepared = preprocess(image, self.max_dimension);
        if prepared.width() == 0 || prepared.height() == 0 {
            return Ok(FeatureSet::empty(kind));
        }
        let mat = gray_to_mat(&prepared)?;

        let mut keypoints = Vector::<KeyPoint>::new();
        let mut descriptors = Mat::default();
        let mask = Mat::default();
        match kind {
            DetectorKind::Orb => {
                let mut orb = ORB::create(
                    self.orb_features,
                    1.2,
                    8,
                    31,
                    0,
                    2,
                    features2d::ORB_ScoreType::HARRIS_SCORE,
                    31,
                    20,
                )?;
                orb.detect_and_compute(&mat, &mask, &mut keypoints, &mut descriptors, false)?;
            }
            DetectorKind::Brisk => {
                let mut brisk = BRISK::create(30, 3, 1.0)?;
                brisk.detect_and_compute(&mat, &mask, &mut keypoints, &mut descriptors, false)?;
            }
            DetectorKind::Sift => detect_sift(&mat, &mask, &mut keypoints, &mut descriptors)?,
        }

        let descriptors = mat_to_descriptors(&descriptors, kind)?;
        Ok(FeatureSet::new(kind, keypoints_from_cv(&keypoints), descriptors))
    }
}

#[cfg(feature = "sift")]
fn detect_sift(
    mat: &Mat,
    mask: &Mat,
    keypoints: &mut Vector<KeyPoint>,
    descriptors: &mut Mat,
) -> Result<(), MatchingError> {
    let mut sift = features2d::SIFT::create_def()?;
    sift.detect_and_compute(mat, mask, keypoints, descriptors, false)?;
    Ok(())
}

#[cfg(not(feature = "sift"))]
fn detect_sift(
    _mat: &Mat,
    _mask: &Mat,
    _keypoints: &mut Vector<KeyPoint>,
    _descriptors: &mut Mat,
) -> Result<(), MatchingError> {
    Err(MatchingError::Other(
        "built without the `sift` feature".into(),
    ))
}
