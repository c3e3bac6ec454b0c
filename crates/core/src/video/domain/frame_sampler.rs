use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame_sample::FrameSample;
use crate::shared::video_metadata::VideoMetadata;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("failed to open video {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),
    #[error("video has invalid frame rate ({fps}) or frame count ({total_frames})")]
    InvalidStream { fps: f64, total_frames: usize },
    #[error("sampler used before open()")]
    NotOpened,
}

/// A sample position whose frame could not be turned into an image.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleError {
    pub timestamp: f64,
    pub reason: String,
}

/// Pulls grayscale frames out of a video at a fixed interval.
///
/// Samples come out in presentation order with timestamps
/// `frame_index / fps`. Implementations are moved onto a reader thread, so
/// they must be `Send`.
pub trait FrameSampler: Send {
    /// Opens a video file and returns its metadata. Fails on streams without
    /// a usable frame rate or frame count.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError>;

    /// Iterates samples taken every `interval_seconds`.
    fn samples(
        &mut self,
        interval_seconds: f64,
    ) -> Box<dyn Iterator<Item = Result<FrameSample, SampleError>> + '_>;

    /// Releases decoder resources. Safe to call more than once.
    fn close(&mut self);
}
