pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod summarizer;
pub mod transcript;
pub mod video;
pub mod youtube;

use std::sync::Arc;
use config::Config;
use error::{AppError, Result};
use llm::{GeminiClient, LanguageModel};
use transcript::TranscriptSource;
use youtube::YouTubeTranscripts;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub model: Arc<dyn LanguageModel>,
}

impl AppState {
    /// Wires the YouTube transcript source and the Gemini client from `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let transcripts = YouTubeTranscripts::new(&config.youtube_base_url)
            .map_err(|e| AppError::ConfigError(format!("Failed to build YouTube client: {}", e)))?;
        let model = GeminiClient::new(&config.gemini_api_key, &config.gemini_model, &config.gemini_endpoint)
            .map_err(|e| AppError::ConfigError(format!("Failed to build Gemini client: {}", e)))?;

        Ok(AppState {
            config: Arc::new(config),
            transcripts: Arc::new(transcripts),
            model: Arc::new(model),
        })
    }
}
