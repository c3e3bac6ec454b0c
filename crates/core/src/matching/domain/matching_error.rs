use thiserror::Error;

use super::detector_kind::DetectorKind;

#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("OpenCV call failed: {0}")]
    OpenCv(#[from] opencv::Error),
    #[error("failed to decode slide {index}: {source}")]
    SlideDecode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot compare {query} descriptors against {train} descriptors")]
    DescriptorMismatch {
        query: DetectorKind,
        train: DetectorKind,
    },
    #[error("{0}")]
    Other(String),
}
