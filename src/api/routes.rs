use axum::{
    routing::post,
    Router,
    extract::{Json, State},
};
use tower_http::cors::{CorsLayer, Any};
use std::time::Instant;

use crate::error::{Result, AppError};
use crate::api::models::SummarizeRequest;
use crate::summarizer::{summarize, SummaryResult};
use crate::transcript::fetch_transcript;
use crate::video::extract_video_id;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/summarize/", post(summarize_handler))
        .route("/summarize", post(summarize_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn summarize_handler(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummaryResult>> {
    tracing::info!("Processing request for URL: {}", req.url);
    let start_time = Instant::now();

    let result = process_summarize_request(&state, &req).await;
    tracing::info!("Request processing took: {:?}", start_time.elapsed());

    match result {
        Ok(summary) => {
            tracing::info!("Successfully summarized URL: {}", req.url);
            Ok(Json(summary))
        }
        Err(err) => {
            match &err {
                AppError::InvalidUrl | AppError::TranscriptNotFound { .. } => {
                    tracing::warn!("Rejected {}: {}", req.url, err);
                }
                _ => {
                    tracing::error!("Failed to summarize {}: {}", req.url, err);
                }
            }
            Err(err)
        }
    }
}

/// Runs URL → video id → transcript → summary, stopping at the first failing stage.
pub async fn process_summarize_request(state: &AppState, req: &SummarizeRequest) -> Result<SummaryResult> {
    let video_id = extract_video_id(&req.url).ok_or(AppError::InvalidUrl)?;
    tracing::info!("Extracted video id {}", video_id);

    let languages = &state.config.transcript_languages;
    let fetch_start = Instant::now();
    let transcript = fetch_transcript(state.transcripts.as_ref(), &video_id, languages)
        .await?
        .ok_or_else(|| AppError::TranscriptNotFound {
            languages: languages.clone(),
        })?;
    tracing::info!(
        "Transcript fetched in {:?} ({} chars)",
        fetch_start.elapsed(),
        transcript.len()
    );

    let llm_start = Instant::now();
    let summary = summarize(state.model.as_ref(), &transcript).await?;
    tracing::info!("Summary generated in {:?}", llm_start.elapsed());

    Ok(summary)
}
