pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Fewer descriptors than this on either side and a comparison is skipped.
pub const MIN_DESCRIPTORS: usize = 10;

/// A homography needs at least four point pairs.
pub const MIN_CORRESPONDENCES: usize = 4;

/// Video length assumed when no transcript segment carries a usable end time.
pub const PLACEHOLDER_DURATION_SECONDS: f64 = 600.0;

/// Frames and slides are downscaled so their longest side fits this before
/// feature extraction.
pub const MAX_IMAGE_DIMENSION: u32 = 1280;

/// Frames are downscaled so their longest side fits this before template
/// correlation.
pub const TEMPLATE_WORKING_WIDTH: u32 = 480;

pub const DEFAULT_TEMPLATE_SCALES: &[f64] = &[1.0, 0.8, 0.6, 0.5];
