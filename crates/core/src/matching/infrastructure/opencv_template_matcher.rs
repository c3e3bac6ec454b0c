use image::imageops::{self, FilterType};
use image::GrayImage;
use opencv::core::{self as cv, Mat};
use opencv::imgproc;
use opencv::prelude::*;

use super::mat_convert::gray_to_mat;
use crate::matching::domain::match_score::MatchScore;
use crate::matching::domain::matching_error::MatchingError;
use crate::matching::domain::preprocess::{condition, preprocess};
use crate::matching::domain::template_matcher::TemplateMatcher;
use crate::slides::domain::slide::Slide;

/// Templates smaller than this carry too little structure to correlate.
const MIN_TEMPLATE_SIDE: u32 = 8;

/// Normalized cross-correlation (`TM_CCOEFF_NORMED`) of each slide, resampled
/// at a few sizes, against a downscaled frame.
///
/// Scale 1.0 is the slide fitted inside the frame; smaller factors model a
/// camera further from the screen.
pub struct OpencvTemplateMatcher {
    scales: Vec<f64>,
    attenuation: f64,
    working_size: u32,
}

impl OpencvTemplateMatcher {
    pub fn new(scales: Vec<f64>, attenuation: f64, working_size: u32) -> Self {
        Self {
            scales,
            attenuation,
            working_size,
        }
    }

    fn correlate(&self, frame: &Mat, frame_size: (u32, u32), slide: &GrayImage) -> Result<f64, MatchingError> {
        let (fw, fh) = frame_size;
        let (sw, sh) = slide.dimensions();
        if sw == 0 || sh == 0 {
            return Ok(0.0);
        }
        let fit = (fw as f64 / sw as f64).min(fh as f64 / sh as f64);

        let mut best = 0.0f64;
        for &scale in &self.scales {
            let tw = ((sw as f64 * fit * scale).round() as u32).min(fw);
            let th = ((sh as f64 * fit * scale).round() as u32).min(fh);
            if tw < MIN_TEMPLATE_SIDE || th < MIN_TEMPLATE_SIDE {
                continue;
            }
            let mut template = imageops::resize(slide, tw, th, FilterType::Triangle);
            condition(&mut template);
            let template = gray_to_mat(&template)?;

            let mut result = Mat::default();
            imgproc::match_template(
                frame,
                &template,
                &mut result,
                imgproc::TM_CCOEFF_NORMED,
                &Mat::default(),
            )?;
            let mut max = 0.0f64;
            cv::min_max_loc(&result, None, Some(&mut max), None, None, &Mat::default())?;
            if max.is_finite() && max > best {
                best = max;
            }
        }
        Ok(best)
    }
}

impl TemplateMatcher for OpencvTemplateMatcher {
    fn best_match(&self, frame: &GrayImage, slides: &[Slide]) -> Result<Option<MatchScore>, MatchingError> {
        if slides.is_empty() {
            return Ok(None);
        }
        let prepared = preprocess(frame, self.working_size);
        let frame_size = prepared.dimensions();
        if frame_size.0 < MIN_TEMPLATE_SIDE || frame_size.1 < MIN_TEMPLATE_SIDE {
            return Ok(None);
        }
        let frame_mat = gray_to_mat(&prepared)?;

        let mut best: Option<MatchScore> = None;
        for slide in slides {
            let raw = self.correlate(&frame_mat, frame_size, &slide.image)?;
            let candidate = MatchScore::new(slide.index, raw * self.attenuation);
            best = MatchScore::better(best, Some(candidate));
        }
        Ok(best.filter(|s| s.confidence > 0.0))
    }
}
