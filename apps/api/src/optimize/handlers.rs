//! Axum route handlers for the Optimization API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::Document;
use crate::errors::AppError;
use crate::optimize::{optimize_document, OptimizationResult};
use crate::scoring::{accept_rescore, score_document};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub company: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub markup: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub result: OptimizationResult,
    pub score_before: u32,
    pub score_after: u32,
    /// Guardrail verdict. When false the caller should keep the original text.
    pub accepted: bool,
}

/// POST /api/v1/optimize
///
/// Full rewrite pipeline, bracketed by before/after rubric scores so the
/// caller can see whether the rewrite actually improved the posting.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    if request.body.trim().is_empty() {
        return Err(AppError::Validation("body cannot be empty".to_string()));
    }
    if request.company.trim().is_empty() {
        return Err(AppError::Validation("company cannot be empty".to_string()));
    }

    let doc = Document {
        title: request.title,
        body: request.body,
        markup: request.markup,
    };

    let before = score_document(&doc, state.llm.as_ref(), &state.weights).await;

    let result = optimize_document(
        &doc,
        &request.company,
        state.fingerprints.as_ref(),
        state.llm.as_ref(),
        state.config.section_chunk_limit,
    )
    .await?;

    let rewritten = Document {
        title: doc.title.clone(),
        body: result.optimized_text.clone(),
        markup: None,
    };
    let after = score_document(&rewritten, state.llm.as_ref(), &state.weights).await;

    let accepted = accept_rescore(
        &before,
        &after,
        state.config.regression_allowance,
        state.config.category_gain_offset,
    );
    if !accepted {
        warn!(
            "Rewrite for '{}' regressed the score {} -> {} beyond the allowance",
            request.company, before.total_score, after.total_score
        );
    }

    Ok(Json(OptimizeResponse {
        result,
        score_before: before.total_score,
        score_after: after.total_score,
        accepted,
    }))
}
