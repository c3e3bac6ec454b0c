use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Duration in seconds, or 0.0 when the frame rate is unknown.
    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Number of decoded frames between two samples taken `interval_seconds` apart.
    pub fn frame_step(&self, interval_seconds: f64) -> usize {
        ((self.fps * interval_seconds).round() as usize).max(1)
    }

    /// How many samples a full pass at `interval_seconds` produces.
    pub fn expected_samples(&self, interval_seconds: f64) -> usize {
        if self.total_frames == 0 {
            return 0;
        }
        self.total_frames.div_ceil(self.frame_step(interval_seconds))
    }
}
