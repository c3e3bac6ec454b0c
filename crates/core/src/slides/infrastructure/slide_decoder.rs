use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::matching::domain::matching_error::MatchingError;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::slides::domain::slide::Slide;

/// Encoded raster bytes for the slide at deck position `index`.
#[derive(Clone, Debug)]
pub struct SlideInput {
    pub index: usize,
    pub bytes: Vec<u8>,
}

impl SlideInput {
    pub fn new(index: usize, bytes: Vec<u8>) -> Self {
        Self { index, bytes }
    }
}

pub fn decode_slide(input: &SlideInput) -> Result<Slide, MatchingError> {
    let image = image::load_from_memory(&input.bytes).map_err(|source| MatchingError::SlideDecode {
        index: input.index,
        source,
    })?;
    Ok(Slide::new(input.index, image.to_luma8()))
}

/// Decodes every input, skipping the ones that fail. Indices of the
/// survivors keep their deck positions.
pub fn decode_slides(inputs: &[SlideInput]) -> Vec<Slide> {
    inputs
        .iter()
        .filter_map(|input| match decode_slide(input) {
            Ok(slide) => Some(slide),
            Err(e) => {
                log::warn!("Skipping slide: {e}");
                None
            }
        })
        .collect()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Expands directories into their image files (sorted by name) and keeps
/// explicitly listed files in the given order.
pub fn collect_slide_paths(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            entries.sort();
            result.extend(entries);
        } else {
            result.push(path.clone());
        }
    }
    Ok(result)
}

/// Reads slide files in deck order. An unreadable file still occupies its
/// index, with empty bytes, so later slides keep their positions.
pub fn read_slide_files(paths: &[PathBuf]) -> Vec<SlideInput> {
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let bytes = fs::read(path).unwrap_or_else(|e| {
                log::warn!("Failed to read slide {}: {e}", path.display());
                Vec::new()
            });
            SlideInput::new(index, bytes)
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn encode_png(image: &image::GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
