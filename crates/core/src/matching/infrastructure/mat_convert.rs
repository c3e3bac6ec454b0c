use image::GrayImage;
use opencv::core::{KeyPoint, Mat, Point2f, Vector, CV_32F, CV_8U};
use opencv::prelude::*;

use crate::matching::domain::detector_kind::DetectorKind;
use crate::matching::domain::feature_set::{Descriptors, Keypoint};
use crate::matching::domain::matching_error::MatchingError;

/// Copies a grayscale image into an owned single-channel `CV_8U` Mat.
pub fn gray_to_mat(image: &GrayImage) -> Result<Mat, opencv::Error> {
    let (w, h) = image.dimensions();
    Mat::new_rows_cols_with_data(h as i32, w as i32, image.as_raw())?.try_clone()
}

pub fn descriptors_to_mat(descriptors: &Descriptors) -> Result<Mat, opencv::Error> {
    let rows = descriptors.len() as i32;
    match descriptors {
        Descriptors::Binary { width, data } => {
            Mat::new_rows_cols_with_data(rows, *width as i32, &data[..rows as usize * width])?
                .try_clone()
        }
        Descriptors::Float { dim, data } => {
            Mat::new_rows_cols_with_data(rows, *dim as i32, &data[..rows as usize * dim])?
                .try_clone()
        }
    }
}

/// Reads a descriptor matrix produced by `kind` back into Rust memory.
pub fn mat_to_descriptors(mat: &Mat, kind: DetectorKind) -> Result<Descriptors, MatchingError> {
    if mat.empty() {
        return Ok(Descriptors::empty_for(kind));
    }
    let cols = mat.cols() as usize;
    match (mat.depth(), kind.is_binary()) {
        (CV_8U, true) => Ok(Descriptors::Binary {
            width: cols,
            data: mat.data_bytes()?.to_vec(),
        }),
        (CV_32F, false) => Ok(Descriptors::Float {
            dim: cols,
            data: mat.data_typed::<f32>()?.to_vec(),
        }),
        (depth, _) => Err(MatchingError::Other(format!(
            "unexpected descriptor depth {depth} for {kind}"
        ))),
    }
}

pub fn keypoints_from_cv(keypoints: &Vector<KeyPoint>) -> Vec<Keypoint> {
    keypoints
        .iter()
        .map(|kp| Keypoint::new(kp.pt().x, kp.pt().y))
        .collect()
}

pub fn keypoints_to_points(keypoints: &[Keypoint]) -> Vector<Point2f> {
    keypoints.iter().map(|k| Point2f::new(k.x, k.y)).collect()
}
