//! Clarity scorer — fluff, sentence length, and a model readability rubric.
//!
//! Hybrid: deterministic signals (regex counts, sentence stats) are worth half
//! the category, a model rubric the other half. Model failure degrades to a
//! neutral model half — never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::document::Document;
use crate::llm_client::CompletionService;
use crate::scoring::prompts::{CLARITY_RUBRIC_TEMPLATE, RUBRIC_SYSTEM};
use crate::scoring::{model_subscores, CategoryScore, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 10.0;
const DETERMINISTIC_MAX: f64 = 5.0;
const MODEL_MAX: f64 = 5.0;
const NEUTRAL_MODEL_SCORE: f64 = 2.5;

const DIMENSIONS: &[&str] = &["readability", "specificity", "fluff"];

static FLUFF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(rockstar|ninja|guru|wizard|synergy|world-class|fast-paced|self-starter|go-getter|hit the ground running|wear many hats|work hard,? play hard)\b")
        .expect("fluff regex is valid")
});

/// Deterministic half: start from the max and subtract for fluff hits and
/// overlong sentences.
fn deterministic_score(body: &str) -> (f64, usize, f64, Vec<String>) {
    let mut score = DETERMINISTIC_MAX;
    let mut suggestions = Vec::new();

    let fluff_hits: Vec<&str> = FLUFF_RE.find_iter(body).map(|m| m.as_str()).collect();
    if !fluff_hits.is_empty() {
        score -= (fluff_hits.len() as f64 * 0.5).min(2.0);
        suggestions.push(format!(
            "Remove filler terms: {}.",
            fluff_hits
                .iter()
                .take(3)
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let avg_words = average_sentence_words(body);
    if avg_words > 30.0 {
        score -= 1.5;
        suggestions.push("Sentences are very long — break them up.".to_string());
    } else if avg_words > 22.0 {
        score -= 0.75;
        suggestions.push("Several sentences run long — tighten them.".to_string());
    }

    (score.max(0.0), fluff_hits.len(), avg_words, suggestions)
}

fn average_sentence_words(body: &str) -> f64 {
    let sentences: Vec<&str> = body
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let total_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    total_words as f64 / sentences.len() as f64
}

pub async fn score(doc: &Document, llm: &dyn CompletionService) -> CategoryScore {
    let (det, fluff_hits, avg_words, mut suggestions) = deterministic_score(&doc.body);

    let prompt = CLARITY_RUBRIC_TEMPLATE
        .replace("{title}", &doc.title)
        .replace("{body}", &doc.body);

    let (model, model_breakdown) = match model_subscores(llm, &prompt, RUBRIC_SYSTEM, DIMENSIONS).await {
        Some(dims) => {
            let avg: f64 = dims.values().sum::<f64>() / dims.len() as f64;
            (avg / 10.0 * MODEL_MAX, json!(dims))
        }
        None => {
            suggestions
                .push("Automated language review unavailable; deterministic signals only.".to_string());
            (NEUTRAL_MODEL_SCORE, serde_json::Value::Null)
        }
    };

    if suggestions.is_empty() {
        suggestions.push(NO_ACTION_NEEDED.to_string());
    }

    CategoryScore::new(
        det + model,
        MAX_SCORE,
        json!({
            "deterministic": det,
            "model": model_breakdown,
            "fluff_hits": fluff_hits,
            "avg_sentence_words": avg_words,
        }),
        suggestions,
    )
}
