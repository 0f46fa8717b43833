//! Axum route handlers for the Scoring API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::Document;
use crate::errors::AppError;
use crate::scoring::cache::ScoreCache;
use crate::scoring::{score_document, ScoreReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub markup: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub report: ScoreReport,
    /// True when the report was served from the content-hash cache.
    pub cached: bool,
}

/// POST /api/v1/score
///
/// Scores a job-posting document against the weighted rubric. Identical
/// content within the cache TTL is served from the score cache without
/// re-running the pipeline.
pub async fn handle_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    if request.body.trim().is_empty() {
        return Err(AppError::Validation("body cannot be empty".to_string()));
    }

    let doc = Document {
        title: request.title,
        body: request.body,
        markup: request.markup,
    };

    let key = ScoreCache::key_for(&doc);
    if let Some(report) = state.score_cache.get(&key) {
        info!("Score cache hit for '{}'", doc.title);
        return Ok(Json(ScoreResponse {
            report,
            cached: true,
        }));
    }

    let report = score_document(&doc, state.llm.as_ref(), &state.weights).await;
    state.score_cache.insert(key, report.clone());

    Ok(Json(ScoreResponse {
        report,
        cached: false,
    }))
}
