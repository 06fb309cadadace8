use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

use crate::summarizer::SummaryError;
use crate::transcript::TranscriptError;

#[derive(Serialize)]
pub struct ErrorResponse {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid YouTube URL or video ID not found.")]
    InvalidUrl,

    #[error("Transcript not found in {}.", language_list(.languages))]
    TranscriptNotFound { languages: Vec<String> },

    #[error("Transcript fetch failed: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Gemini summarization failed: {0}")]
    Summarization(#[from] SummaryError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl => StatusCode::BAD_REQUEST,
            AppError::TranscriptNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Transcript(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Summarization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}

/// "English or Hindi" style list of language names.
fn language_list(codes: &[String]) -> String {
    let names: Vec<&str> = codes.iter().map(|code| language_name(code)).collect();
    match names.split_last() {
        None => String::from("any language"),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "hi" => "Hindi",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "ja" => "Japanese",
        other => other,
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
