use super::detector_kind::DetectorKind;

/// Keypoint location in pixels of the preprocessed image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Row-major descriptor matrix, one row per keypoint.
#[derive(Clone, Debug, PartialEq)]
pub enum Descriptors {
    /// Packed bit strings, `width` bytes per row.
    Binary { width: usize, data: Vec<u8> },
    /// Float vectors, `dim` values per row.
    Float { dim: usize, data: Vec<f32> },
}

impl Descriptors {
    pub fn empty_for(kind: DetectorKind) -> Self {
        if kind.is_binary() {
            Descriptors::Binary {
                width: 0,
                data: Vec::new(),
            }
        } else {
            Descriptors::Float {
                dim: 0,
                data: Vec::new(),
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Descriptors::Binary { width, data } if *width > 0 => data.len() / width,
            Descriptors::Float { dim, data } if *dim > 0 => data.len() / dim,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn binary_row(&self, row: usize) -> Option<&[u8]> {
        match self {
            Descriptors::Binary { width, data } if row < self.len() => {
                Some(&data[row * width..(row + 1) * width])
            }
            _ => None,
        }
    }

    /// Drops rows past `rows`.
    pub fn truncate(&mut self, rows: usize) {
        match self {
            Descriptors::Binary { width, data } => data.truncate(rows * *width),
            Descriptors::Float { dim, data } => data.truncate(rows * *dim),
        }
    }
}

/// Keypoints and descriptors of one image under one detector family.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSet {
    pub detector: DetectorKind,
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Descriptors,
}

impl FeatureSet {
    /// Builds a set, trimming whichever side is longer so keypoints and
    /// descriptor rows stay aligned.
    pub fn new(detector: DetectorKind, mut keypoints: Vec<Keypoint>, mut descriptors: Descriptors) -> Self {
        let rows = keypoints.len().min(descriptors.len());
        keypoints.truncate(rows);
        descriptors.truncate(rows);
        Self {
            detector,
            keypoints,
            descriptors,
        }
    }

    pub fn empty(detector: DetectorKind) -> Self {
        Self {
            detector,
            keypoints: Vec::new(),
            descriptors: Descriptors::empty_for(detector),
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Features of one slide, computed once per run and shared read-only.
#[derive(Clone, Debug, PartialEq)]
pub struct SlideFeatureSet {
    pub slide_index: usize,
    pub features: FeatureSet,
}
