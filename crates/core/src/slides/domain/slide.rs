use image::GrayImage;

/// One rendered presentation slide, in luma.
///
/// `index` is the slide's zero-based position in the deck and is what
/// timelines and transcript segments refer to.
#[derive(Clone, Debug)]
pub struct Slide {
    pub index: usize,
    pub image: GrayImage,
}

impl Slide {
    pub fn new(index: usize, image: GrayImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
