//! Fixtures shared by unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{GrayImage, Luma};

use crate::shared::frame_sample::FrameSample;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_sampler::{FrameSampler, SampleError, VideoError};

/// Deterministic clutter of filled rectangles, rich in corners.
pub fn textured_image(width: u32, height: u32, seed: u32) -> GrayImage {
    let mut image = GrayImage::from_pixel(width, height, Luma([30]));
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut next = |bound: u32| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 8) % bound.max(1)
    };
    for _ in 0..60 {
        let w = 6 + next(width / 6);
        let h = 6 + next(height / 6);
        let x0 = next(width.saturating_sub(w));
        let y0 = next(height.saturating_sub(h));
        let value = 60 + next(190) as u8;
        for y in y0..(y0 + h).min(height) {
            for x in x0..(x0 + w).min(width) {
                image.put_pixel(x, y, Luma([value]));
            }
        }
    }
    image
}

pub fn uniform_image(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// In-memory [`FrameSampler`] replaying a fixed list of frames, one per
/// sample. `None` entries come out as unreadable samples.
pub struct ScriptedSampler {
    pub frames: Vec<Option<GrayImage>>,
    pub fps: f64,
    pub fail_open: bool,
    pub delay: Duration,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedSampler {
    pub fn new(frames: Vec<Option<GrayImage>>) -> Self {
        Self {
            frames,
            fps: 10.0,
            fail_open: false,
            delay: Duration::ZERO,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }
}

impl FrameSampler for ScriptedSampler {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError> {
        if self.fail_open {
            return Err(VideoError::Open {
                path: path.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(VideoMetadata {
            width: 64,
            height: 48,
            fps: self.fps,
            total_frames: self.frames.len() * self.fps.round() as usize,
            codec: "scripted".to_string(),
            source_path: Some(path.to_path_buf()),
        })
    }

    fn samples(
        &mut self,
        interval_seconds: f64,
    ) -> Box<dyn Iterator<Item = Result<FrameSample, SampleError>> + '_> {
        let fps = self.fps;
        let delay = self.delay;
        Box::new(self.frames.iter().enumerate().map(move |(i, frame)| {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            let timestamp = i as f64 * interval_seconds;
            match frame {
                Some(image) => Ok(FrameSample::new(
                    timestamp,
                    (timestamp * fps).round() as usize,
                    image.clone(),
                )),
                None => Err(SampleError {
                    timestamp,
                    reason: "scripted decode failure".to_string(),
                }),
            }
        }))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Polls `flag` until it is set or `limit` passes. Returns the final value.
pub fn wait_for(flag: &AtomicBool, limit: Duration) -> bool {
    let start = std::time::Instant::now();
    while !flag.load(Ordering::SeqCst) {
        if start.elapsed() >= limit {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}
