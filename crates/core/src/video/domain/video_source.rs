use std::path::PathBuf;

/// Where the lecture recording lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoSource {
    /// A file that can be decoded frame by frame.
    Local(PathBuf),
    /// Only a remote reference exists; no frames can be sampled.
    Remote(String),
    /// No video at all.
    Unavailable,
}

impl VideoSource {
    /// `http://` and `https://` locations are remote, anything else is a
    /// local path. Blank input means there is no video.
    pub fn from_location(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if trimmed.is_empty() {
            VideoSource::Unavailable
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            VideoSource::Remote(trimmed.to_string())
        } else {
            VideoSource::Local(PathBuf::from(trimmed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::https("https://cdn.example.com/lecture.mp4", false)]
    #[case::http_upper("HTTP://example.com/a.mp4", false)]
    #[case::absolute("/data/lecture.mp4", true)]
    #[case::relative("lecture.mkv", true)]
    fn test_from_location(#[case] location: &str, #[case] local: bool) {
        assert_eq!(
            matches!(VideoSource::from_location(location), VideoSource::Local(_)),
            local
        );
    }

    #[test]
    fn test_remote_keeps_url() {
        assert_eq!(
            VideoSource::from_location(" https://x.org/v.mp4 "),
            VideoSource::Remote("https://x.org/v.mp4".into())
        );
    }

    #[test]
    fn test_blank_is_unavailable() {
        assert_eq!(VideoSource::from_location("   "), VideoSource::Unavailable);
    }
}
