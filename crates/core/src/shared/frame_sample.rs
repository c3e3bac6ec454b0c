use image::GrayImage;

/// One grayscale frame sampled from the lecture video.
///
/// Transient: produced by a [`FrameSampler`](crate::video::domain::frame_sampler::FrameSampler),
/// scored once, then dropped.
#[derive(Clone, Debug)]
pub struct FrameSample {
    timestamp: f64,
    frame_index: usize,
    image: GrayImage,
}

impl FrameSample {
    pub fn new(timestamp: f64, frame_index: usize, image: GrayImage) -> Self {
        debug_assert!(timestamp >= 0.0, "sample timestamp must be non-negative");
        Self {
            timestamp,
            frame_index,
            image,
        }
    }

    /// Presentation time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Index of the decoded frame this sample was taken from.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
