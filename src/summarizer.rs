//! Turns a transcript into a topic name and summary using a language model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::llm::{GenerationConfig, LanguageModel, LlmError, Turn};

const FORMAT_INSTRUCTION: &str = "Based on above Youtube transcription return me breif transcription of its summary in given JSON format:

{
\"topic_name\":\"name of topic\"
\"topic_summary\":\"summary of topic\"
}";

const TRANSCRIPT_REQUEST: &str = "I need the YouTube transcription to provide you with the JSON format you requested. Please provide the transcription text so I can create the summary and format it correctly.
";

const TEMPERATURE: f32 = 0.5;
const RESPONSE_MIME_TYPE: &str = "text/plain";

// Greedy on purpose: spans from the first `{` to the last `}`
static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{.*\}").expect("Failed to compile JSON block pattern")
});

/// The JSON the model produced, passed through without schema checks.
///
/// Normally an object with `topic_name` and `topic_summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SummaryResult(Value);

impl SummaryResult {
    pub fn topic_name(&self) -> Option<&str> {
        self.0.get("topic_name").and_then(Value::as_str)
    }

    pub fn topic_summary(&self) -> Option<&str> {
        self.0.get("topic_summary").and_then(Value::as_str)
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Could not extract JSON from Gemini response.")]
    NoJson,

    #[error("invalid JSON in model response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Builds the primed three-turn conversation ending with the transcript.
pub fn build_conversation(transcript: &str) -> Vec<Turn> {
    vec![
        Turn::user(FORMAT_INSTRUCTION),
        Turn::model(TRANSCRIPT_REQUEST),
        Turn::user(transcript),
    ]
}

pub fn generation_config() -> GenerationConfig {
    GenerationConfig {
        temperature: TEMPERATURE,
        response_mime_type: RESPONSE_MIME_TYPE.to_string(),
    }
}

/// Parses the model reply, tolerating prose around the JSON.
///
/// The whole reply is tried first. Otherwise the span from the first `{` to
/// the last `}` is parsed, which fails when the reply holds several separate
/// JSON blocks.
pub fn parse_summary(text: &str) -> Result<SummaryResult, SummaryError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(SummaryResult(value));
    }

    let block = JSON_BLOCK.find(text).ok_or(SummaryError::NoJson)?;
    let value = serde_json::from_str(block.as_str())?;
    Ok(SummaryResult(value))
}

pub async fn summarize(model: &dyn LanguageModel, transcript: &str) -> Result<SummaryResult, SummaryError> {
    let turns = build_conversation(transcript);
    let reply = model.generate(&turns, &generation_config()).await?;
    tracing::debug!("Model replied with {} chars", reply.len());
    parse_summary(&reply)
}
