use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::transcript::{TranscriptError, TranscriptFragment, TranscriptSource, first_available};
use crate::video::VideoId;

pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

static INNERTUBE_API_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
        .expect("Failed to compile innertube key pattern")
});

/// A caption track listed by the InnerTube player endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub base_url: String,
    pub is_generated: bool,
}

/// Transcript source backed by YouTube's watch page and InnerTube player API.
pub struct YouTubeTranscripts {
    client: Client,
    base_url: String,
}

impl YouTubeTranscripts {
    pub fn new(base_url: &str) -> Result<Self, TranscriptError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

        let client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_watch_page(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let response = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id.as_str())])
            .send()
            .await?;
        let response = check_status(response, video_id)?;
        Ok(response.text().await?)
    }

    async fn fetch_player(&self, video_id: &VideoId, api_key: &str) -> Result<Value, TranscriptError> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video_id.as_str()
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, video_id)?;

        response
            .json()
            .await
            .map_err(|_| TranscriptError::YouTubeDataUnparsable(video_id.to_string()))
    }

    async fn fetch_track(
        &self,
        video_id: &VideoId,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptFragment>, TranscriptError> {
        if track.base_url.contains("&exp=xpe") {
            return Err(TranscriptError::PoTokenRequired(video_id.to_string()));
        }

        tracing::debug!(
            "Fetching '{}' captions for {} (generated: {})",
            track.language_code,
            video_id,
            track.is_generated
        );
        let url = json3_url(&track.base_url)
            .ok_or_else(|| TranscriptError::YouTubeDataUnparsable(video_id.to_string()))?;
        let response = self.client.get(url).send().await?;
        let response = check_status(response, video_id)?;
        let body = response.text().await?;

        parse_json3(&body).ok_or_else(|| TranscriptError::YouTubeDataUnparsable(video_id.to_string()))
    }

    /// Every caption track of the video, from one watch page + player round trip.
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, TranscriptError> {
        tracing::debug!("Fetching watch page for {}", video_id);
        let html = self.fetch_watch_page(video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;

        tracing::debug!("Fetching caption tracks for {}", video_id);
        let player = self.fetch_player(video_id, &api_key).await?;
        caption_tracks(&player, video_id)
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn fetch(
        &self,
        video_id: &VideoId,
        language: &str,
    ) -> Result<Vec<TranscriptFragment>, TranscriptError> {
        let tracks = self.list_tracks(video_id).await?;
        let track = select_track(&tracks, video_id, language)?;
        self.fetch_track(video_id, track).await
    }

    async fn fetch_first(
        &self,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Option<Vec<TranscriptFragment>>, TranscriptError> {
        let tracks = self.list_tracks(video_id).await?;
        let tracks = &tracks;

        first_available(video_id, languages, |language| async move {
            let track = select_track(tracks, video_id, language)?;
            self.fetch_track(video_id, track).await
        })
        .await
    }
}

/// The track's caption URL with `fmt` forced to `json3`.
fn json3_url(base_url: &str) -> Option<Url> {
    let mut url = Url::parse(base_url).ok()?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| *key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");
    Some(url)
}

fn check_status(response: Response, video_id: &VideoId) -> Result<Response, TranscriptError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TranscriptError::IpBlocked(video_id.to_string()));
    }
    if !status.is_success() {
        return Err(TranscriptError::Http(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        )));
    }
    Ok(response)
}

fn extract_innertube_api_key(html: &str, video_id: &VideoId) -> Result<String, TranscriptError> {
    if html.contains("g-recaptcha") {
        return Err(TranscriptError::IpBlocked(video_id.to_string()));
    }

    INNERTUBE_API_KEY
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str().to_string())
        .ok_or_else(|| TranscriptError::YouTubeDataUnparsable(video_id.to_string()))
}

fn assert_playability(player: &Value, video_id: &VideoId) -> Result<(), TranscriptError> {
    let Some(playability) = player.get("playabilityStatus") else {
        return Ok(());
    };

    let status = playability["status"].as_str().unwrap_or("");
    if status == "OK" {
        return Ok(());
    }
    let reason = playability["reason"].as_str().unwrap_or("");

    match status {
        "LOGIN_REQUIRED" if reason.contains("not a bot") => {
            Err(TranscriptError::RequestBlocked(video_id.to_string()))
        }
        "LOGIN_REQUIRED" if reason.contains("inappropriate for some users") => {
            Err(TranscriptError::AgeRestricted(video_id.to_string()))
        }
        "ERROR" if reason.contains("unavailable") => {
            Err(TranscriptError::VideoUnavailable(video_id.to_string()))
        }
        _ => Err(TranscriptError::VideoUnplayable(
            video_id.to_string(),
            reason.to_string(),
        )),
    }
}

/// Reads the caption tracks out of an InnerTube player response.
pub fn caption_tracks(player: &Value, video_id: &VideoId) -> Result<Vec<CaptionTrack>, TranscriptError> {
    assert_playability(player, video_id)?;

    let tracks: Vec<CaptionTrack> = player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"]
        .as_array()
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|track| {
                    Some(CaptionTrack {
                        language_code: track["languageCode"].as_str()?.to_string(),
                        base_url: track["baseUrl"].as_str()?.to_string(),
                        is_generated: track["kind"].as_str() == Some("asr"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::TranscriptsDisabled(video_id.to_string()));
    }

    Ok(tracks)
}

/// Picks the track for `language`, preferring manually created captions.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    video_id: &VideoId,
    language: &str,
) -> Result<&'a CaptionTrack, TranscriptError> {
    let mut matching = tracks.iter().filter(|track| track.language_code == language);
    let manual = matching.clone().find(|track| !track.is_generated);

    manual
        .or_else(|| matching.next())
        .ok_or_else(|| TranscriptError::NoTranscriptFound {
            video_id: video_id.to_string(),
            language: language.to_string(),
        })
}

#[derive(Deserialize)]
struct Json3Transcript {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    segs: Option<Vec<Json3Segment>>,
}

#[derive(Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parses a `fmt=json3` caption body into fragments.
///
/// Events without segments and whitespace-only events (line break markers in
/// auto-generated captions) are skipped.
pub fn parse_json3(body: &str) -> Option<Vec<TranscriptFragment>> {
    let transcript: Json3Transcript = serde_json::from_str(body).ok()?;

    let fragments = transcript
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.into_iter().map(|seg| seg.utf8).collect();
            if text.trim().is_empty() {
                return None;
            }
            Some(TranscriptFragment {
                text,
                start: event.start_ms as f64 / 1000.0,
                duration: event.duration_ms as f64 / 1000.0,
            })
        })
        .collect();

    Some(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::extract_video_id;

    fn video() -> VideoId {
        extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap()
    }

    fn track(language: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: language.to_string(),
            base_url: format!("https://example.test/{}/{}", language, generated),
            is_generated: generated,
        }
    }

    #[test]
    fn finds_innertube_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key"});</script>"#;
        assert_eq!(extract_innertube_api_key(html, &video()).unwrap(), "AIzaSyA-test_key");
    }

    #[test]
    fn recaptcha_page_means_blocked() {
        let html = r#"<div class="g-recaptcha"></div>"#;
        assert!(matches!(
            extract_innertube_api_key(html, &video()),
            Err(TranscriptError::IpBlocked(_))
        ));
    }

    #[test]
    fn missing_key_is_unparsable() {
        assert!(matches!(
            extract_innertube_api_key("<html></html>", &video()),
            Err(TranscriptError::YouTubeDataUnparsable(_))
        ));
    }

    #[test]
    fn prefers_manual_track() {
        let tracks = vec![track("en", true), track("en", false), track("hi", true)];
        let selected = select_track(&tracks, &video(), "en").unwrap();
        assert!(!selected.is_generated);
    }

    #[test]
    fn falls_back_to_generated_track() {
        let tracks = vec![track("en", false), track("hi", true)];
        let selected = select_track(&tracks, &video(), "hi").unwrap();
        assert_eq!(selected.language_code, "hi");
        assert!(selected.is_generated);
    }

    #[test]
    fn missing_language_is_not_found() {
        let tracks = vec![track("de", false)];
        assert!(matches!(
            select_track(&tracks, &video(), "en"),
            Err(TranscriptError::NoTranscriptFound { .. })
        ));
    }

    #[test]
    fn reads_caption_tracks() {
        let player = json!({
            "playabilityStatus": { "status": "OK" },
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        { "baseUrl": "https://example.test/en", "languageCode": "en" },
                        { "baseUrl": "https://example.test/hi", "languageCode": "hi", "kind": "asr" },
                        { "languageCode": "fr" }
                    ]
                }
            }
        });

        let tracks = caption_tracks(&player, &video()).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0], CaptionTrack {
            language_code: "en".into(),
            base_url: "https://example.test/en".into(),
            is_generated: false,
        });
        assert!(tracks[1].is_generated);
    }

    #[test]
    fn no_captions_means_disabled() {
        let player = json!({ "playabilityStatus": { "status": "OK" } });
        assert!(matches!(
            caption_tracks(&player, &video()),
            Err(TranscriptError::TranscriptsDisabled(_))
        ));
    }

    #[test]
    fn maps_playability_errors() {
        let unavailable = json!({
            "playabilityStatus": { "status": "ERROR", "reason": "This video is unavailable" }
        });
        assert!(matches!(
            caption_tracks(&unavailable, &video()),
            Err(TranscriptError::VideoUnavailable(_))
        ));

        let bot_check = json!({
            "playabilityStatus": {
                "status": "LOGIN_REQUIRED",
                "reason": "Sign in to confirm you're not a bot"
            }
        });
        assert!(matches!(
            caption_tracks(&bot_check, &video()),
            Err(TranscriptError::RequestBlocked(_))
        ));

        let live = json!({
            "playabilityStatus": { "status": "LIVE_STREAM_OFFLINE", "reason": "Premieres soon" }
        });
        match caption_tracks(&live, &video()) {
            Err(TranscriptError::VideoUnplayable(_, reason)) => assert_eq!(reason, "Premieres soon"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn json3_url_replaces_any_fmt() {
        let url = json3_url("https://example.test/api/timedtext?fmt=srv3&v=abc&lang=en").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![
            ("v".to_string(), "abc".to_string()),
            ("lang".to_string(), "en".to_string()),
            ("fmt".to_string(), "json3".to_string()),
        ]);

        let url = json3_url("https://example.test/api/timedtext?v=abc").unwrap();
        assert_eq!(url.query(), Some("v=abc&fmt=json3"));
    }

    #[test]
    fn json3_url_rejects_relative_urls() {
        assert!(json3_url("/api/timedtext?v=abc").is_none());
    }

    #[test]
    fn parses_json3_events_in_order() {
        let body = r#"{
            "events": [
                { "tStartMs": 0, "dDurationMs": 1500, "segs": [{ "utf8": "hello " }, { "utf8": "there" }] },
                { "tStartMs": 1500, "dDurationMs": 10 },
                { "tStartMs": 1500, "segs": [{ "utf8": "\n" }] },
                { "tStartMs": 2000, "dDurationMs": 500, "segs": [{ "utf8": "world" }] }
            ]
        }"#;

        let fragments = parse_json3(body).unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "hello there");
        assert_eq!(fragments[0].duration, 1.5);
        assert_eq!(fragments[1].text, "world");
        assert_eq!(fragments[1].start, 2.0);
    }

    #[test]
    fn rejects_non_json_captions() {
        assert!(parse_json3("<transcript></transcript>").is_none());
    }
}
