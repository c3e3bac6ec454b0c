use serde::{Deserialize, Serialize};

/// Feature detector families, cheapest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Oriented FAST + rotated BRIEF. Binary descriptors.
    Orb,
    /// Binary Robust Invariant Scalable Keypoints. Denser than ORB, still binary.
    Brisk,
    /// Scale-invariant float descriptors. Most expensive; only present when
    /// built with the `sift` feature.
    Sift,
}

impl DetectorKind {
    pub const ESCALATION: &[DetectorKind] =
        &[DetectorKind::Orb, DetectorKind::Brisk, DetectorKind::Sift];

    /// Binary descriptors are compared by Hamming distance, float ones by L2.
    pub fn is_binary(self) -> bool {
        matches!(self, DetectorKind::Orb | DetectorKind::Brisk)
    }

    pub fn is_available(self) -> bool {
        match self {
            DetectorKind::Orb | DetectorKind::Brisk => true,
            DetectorKind::Sift => cfg!(feature = "sift"),
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorKind::Orb => write!(f, "ORB"),
            DetectorKind::Brisk => write!(f, "BRISK"),
            DetectorKind::Sift => write!(f, "SIFT"),
        }
    }
}
