use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::transcript::domain::transcript_segment::TranscriptSegment;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("failed to read transcript {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid transcript {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Accepts either a bare segment array or an object with a `segments` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptDocument {
    Bare(Vec<TranscriptSegment>),
    Wrapped { segments: Vec<TranscriptSegment> },
}

pub fn parse_segments(json: &str) -> Result<Vec<TranscriptSegment>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        TranscriptDocument::Bare(segments) => segments,
        TranscriptDocument::Wrapped { segments } => segments,
    })
}

pub fn load_segments(path: &Path) -> Result<Vec<TranscriptSegment>, TranscriptError> {
    let text = fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_segments(&text).map_err(|source| TranscriptError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
