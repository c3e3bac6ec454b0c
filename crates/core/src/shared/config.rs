use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::domain::detector_kind::DetectorKind;
use crate::shared::constants::{
    DEFAULT_TEMPLATE_SCALES, MAX_IMAGE_DIMENSION, MIN_DESCRIPTORS, PLACEHOLDER_DURATION_SECONDS,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("at least one detector must be configured")]
    NoDetectors,
}

/// Tunables for one slide-matching run.
///
/// The numeric defaults were tuned empirically on lecture recordings; all of
/// them can be overridden from a JSON file or the CLI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Seconds between sampled frames.
    pub frame_interval_seconds: f64,
    /// Best-slide confidence below this counts as "no match".
    pub min_confidence: f64,
    /// Minimum homography inliers for a slide to be eligible.
    pub min_inliers: usize,
    /// Lowe ratio for the binary detector families.
    pub ratio_test_threshold: f32,
    /// Lowe ratio for SIFT descriptors.
    pub sift_ratio_threshold: f32,
    /// Consecutive agreeing samples needed to commit a slide change.
    pub change_confirm_threshold: usize,
    /// RANSAC inlier threshold in pixels.
    pub reprojection_threshold: f64,
    pub min_descriptors: usize,
    pub inlier_weight: f64,
    pub match_weight: f64,
    pub orb_features: i32,
    /// Detector families in escalation order.
    pub detectors: Vec<DetectorKind>,
    pub enable_template_fallback: bool,
    pub template_scales: Vec<f64>,
    pub template_attenuation: f64,
    pub max_image_dimension: u32,
    /// Wall-clock budget for frame sampling. `None` waits for the whole video.
    pub timeout_seconds: Option<f64>,
    pub placeholder_duration: f64,
    /// Decoded samples buffered between the reader thread and the scorer.
    pub channel_capacity: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            frame_interval_seconds: 5.0,
            min_confidence: 0.1,
            min_inliers: 4,
            ratio_test_threshold: 0.75,
            sift_ratio_threshold: 0.7,
            change_confirm_threshold: 2,
            reprojection_threshold: 5.0,
            min_descriptors: MIN_DESCRIPTORS,
            inlier_weight: 0.7,
            match_weight: 0.3,
            orb_features: 3000,
            detectors: DetectorKind::ESCALATION.to_vec(),
            enable_template_fallback: true,
            template_scales: DEFAULT_TEMPLATE_SCALES.to_vec(),
            template_attenuation: 0.7,
            max_image_dimension: MAX_IMAGE_DIMENSION,
            timeout_seconds: None,
            placeholder_duration: PLACEHOLDER_DURATION_SECONDS,
            channel_capacity: 4,
        }
    }
}

impl MatchingConfig {
    /// Loads a config from JSON. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "frame_interval_seconds",
            "a positive number",
            self.frame_interval_seconds,
            self.frame_interval_seconds.is_finite() && self.frame_interval_seconds > 0.0,
        )?;
        check(
            "min_confidence",
            "between 0.0 and 1.0",
            self.min_confidence,
            (0.0..=1.0).contains(&self.min_confidence),
        )?;
        check(
            "ratio_test_threshold",
            "between 0.0 and 1.0 (exclusive)",
            self.ratio_test_threshold,
            self.ratio_test_threshold > 0.0 && self.ratio_test_threshold < 1.0,
        )?;
        check(
            "sift_ratio_threshold",
            "between 0.0 and 1.0 (exclusive)",
            self.sift_ratio_threshold,
            self.sift_ratio_threshold > 0.0 && self.sift_ratio_threshold < 1.0,
        )?;
        check(
            "change_confirm_threshold",
            ">= 1",
            self.change_confirm_threshold,
            self.change_confirm_threshold >= 1,
        )?;
        check(
            "reprojection_threshold",
            "a positive number",
            self.reprojection_threshold,
            self.reprojection_threshold > 0.0,
        )?;
        check(
            "inlier_weight + match_weight",
            "equal to 1.0",
            self.inlier_weight + self.match_weight,
            self.inlier_weight >= 0.0
                && self.match_weight >= 0.0
                && (self.inlier_weight + self.match_weight - 1.0).abs() < 1e-6,
        )?;
        check(
            "orb_features",
            "a positive number",
            self.orb_features,
            self.orb_features > 0,
        )?;
        check(
            "template_attenuation",
            "between 0.0 and 1.0",
            self.template_attenuation,
            (0.0..=1.0).contains(&self.template_attenuation),
        )?;
        check(
            "template_scales",
            "non-empty with every scale in (0.0, 1.0]",
            format!("{:?}", self.template_scales),
            !self.template_scales.is_empty()
                && self.template_scales.iter().all(|s| *s > 0.0 && *s <= 1.0),
        )?;
        check(
            "max_image_dimension",
            ">= 64",
            self.max_image_dimension,
            self.max_image_dimension >= 64,
        )?;
        if let Some(timeout) = self.timeout_seconds {
            check(
                "timeout_seconds",
                "a positive number",
                timeout,
                timeout.is_finite() && timeout > 0.0,
            )?;
        }
        check(
            "placeholder_duration",
            "a positive number",
            self.placeholder_duration,
            self.placeholder_duration > 0.0,
        )?;
        check(
            "channel_capacity",
            ">= 1",
            self.channel_capacity,
            self.channel_capacity >= 1,
        )?;
        if self.detectors.is_empty() {
            return Err(ConfigError::NoDetectors);
        }
        Ok(())
    }

    /// Lowe ratio used for descriptors produced by `kind`.
    pub fn ratio_for(&self, kind: DetectorKind) -> f32 {
        match kind {
            DetectorKind::Orb | DetectorKind::Brisk => self.ratio_test_threshold,
            DetectorKind::Sift => self.sift_ratio_threshold,
        }
    }

    /// Sampling budget. A value too large for a `Duration` means no budget.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }

    /// Configured detectors this build can actually run, in escalation order.
    pub fn available_detectors(&self) -> Vec<DetectorKind> {
        let mut kinds: Vec<DetectorKind> = Vec::new();
        for &kind in &self.detectors {
            if !kind.is_available() {
                log::warn!("Detector {kind} is not available in this build, skipping");
                continue;
            }
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

fn check(
    field: &'static str,
    expected: &'static str,
    value: impl ToString,
    ok: bool,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value: value.to_string(),
        })
    }
}
