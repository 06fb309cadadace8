use async_trait::async_trait;
use std::future::Future;
use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// One caption entry. Only `text` ends up in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("No transcript found for video {video_id} in language '{language}'")]
    NoTranscriptFound { video_id: String, language: String },

    #[error("Subtitles are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("Video {0} is unavailable")]
    VideoUnavailable(String),

    #[error("Video {0} is unplayable: {1}")]
    VideoUnplayable(String, String),

    #[error("Video {0} is age restricted")]
    AgeRestricted(String),

    #[error("YouTube is blocking requests for video {0}")]
    RequestBlocked(String),

    #[error("YouTube is blocking requests from this IP (video {0})")]
    IpBlocked(String),

    #[error("Video {0} requires a PO token to fetch captions")]
    PoTokenRequired(String),

    #[error("Could not parse YouTube data for video {0}")]
    YouTubeDataUnparsable(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(err: reqwest::Error) -> Self {
        TranscriptError::Http(err.to_string())
    }
}

/// Somewhere captions can be fetched from, one language at a time.
///
/// Implementations must report a missing language as
/// [`TranscriptError::NoTranscriptFound`] and nothing else, so that the
/// language fallback can tell it apart from real failures.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(
        &self,
        video_id: &VideoId,
        language: &str,
    ) -> Result<Vec<TranscriptFragment>, TranscriptError>;

    /// Fragments in the first available language of `languages`.
    ///
    /// Sources that can list every track up front override this to avoid one
    /// lookup per language.
    async fn fetch_first(
        &self,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Option<Vec<TranscriptFragment>>, TranscriptError> {
        first_available(video_id, languages, |language| self.fetch(video_id, language)).await
    }
}

/// Runs `attempt` for each language in order until one succeeds.
///
/// Only `NoTranscriptFound` moves on to the next language. Any other error is
/// returned as is.
pub async fn first_available<'a, F, Fut>(
    video_id: &VideoId,
    languages: &'a [String],
    mut attempt: F,
) -> Result<Option<Vec<TranscriptFragment>>, TranscriptError>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<Vec<TranscriptFragment>, TranscriptError>>,
{
    for language in languages {
        match attempt(language.as_str()).await {
            Ok(fragments) => {
                tracing::info!(
                    "Fetched {} transcript fragments for {} in '{}'",
                    fragments.len(),
                    video_id,
                    language
                );
                return Ok(Some(fragments));
            }
            Err(TranscriptError::NoTranscriptFound { .. }) => {
                tracing::warn!("No '{}' transcript for {}, trying next language", language, video_id);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(None)
}

/// Fetches the transcript in the first available language of `languages`.
///
/// Returns `Ok(None)` when every language reported "not found" or the
/// transcript found has no text. Any other source failure is returned as is,
/// without trying further languages.
pub async fn fetch_transcript(
    source: &dyn TranscriptSource,
    video_id: &VideoId,
    languages: &[String],
) -> Result<Option<String>, TranscriptError> {
    let fragments = source.fetch_first(video_id, languages).await?;

    Ok(fragments
        .map(|fragments| join_fragments(&fragments))
        .filter(|text| !text.is_empty()))
}

/// Joins fragment texts in order, one per line.
pub fn join_fragments(fragments: &[TranscriptFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
