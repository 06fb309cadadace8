use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

// Compile the URL pattern once for the whole process
static VIDEO_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/(?:.*v=|.*/(?:embed|v|shorts)/)|youtu\.be/)([0-9A-Za-z_-]{11})")
        .expect("Failed to compile video id pattern")
});

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the video id from a watch, embed, `/v/`, shorts or `youtu.be` URL.
///
/// Returns `None` when no known URL shape matches. The id is not checked
/// against YouTube.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    VIDEO_ID_PATTERN
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|id| VideoId(id.as_str().to_string()))
}
