//! Page-context scorer — is the surrounding page a credible place to apply?
//! Hybrid: markup signal checks plus a model presentation rubric.

use serde_json::json;

use crate::document::{strip_tags, Document};
use crate::llm_client::CompletionService;
use crate::scoring::prompts::{PAGE_CONTEXT_RUBRIC_TEMPLATE, RUBRIC_SYSTEM};
use crate::scoring::{model_subscores, CategoryScore, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 10.0;
const MODEL_MAX: f64 = 5.0;
const NEUTRAL_MODEL_SCORE: f64 = 2.5;
const NEUTRAL_DETERMINISTIC_SCORE: f64 = 2.0;

const DIMENSIONS: &[&str] = &["professionalism", "trust_signals", "completeness"];

fn deterministic_score(doc: &Document) -> (f64, Vec<String>) {
    let Some(markup) = doc.markup.as_deref() else {
        // Without markup we cannot judge the page, only the text.
        return (
            NEUTRAL_DETERMINISTIC_SCORE,
            vec!["No page markup available — page-quality checks skipped.".to_string()],
        );
    };

    let mut score = 0.0_f64;
    let mut suggestions = Vec::new();

    // Boilerplate ratio: how much of the visible page is the posting itself.
    let visible = strip_tags(markup);
    let ratio = if visible.is_empty() {
        0.0
    } else {
        doc.body.chars().count() as f64 / visible.chars().count() as f64
    };
    if ratio >= 0.5 {
        score += 2.0;
    } else if ratio >= 0.25 {
        score += 1.0;
        suggestions.push("The posting is buried in page boilerplate — trim surrounding chrome.".to_string());
    } else {
        suggestions.push("The posting is a small fraction of the page — candidates will struggle to find it.".to_string());
    }

    let markup_lower = markup.to_lowercase();
    if markup_lower.contains("apply") {
        score += 2.0;
    } else {
        suggestions.push("No apply link or button found on the page.".to_string());
    }

    if !doc.title.is_empty() && markup_lower.contains(&doc.title.to_lowercase()) {
        score += 1.0;
    }

    (score, suggestions)
}

pub async fn score(doc: &Document, llm: &dyn CompletionService) -> CategoryScore {
    let (det, mut suggestions) = deterministic_score(doc);

    let prompt = PAGE_CONTEXT_RUBRIC_TEMPLATE
        .replace("{title}", &doc.title)
        .replace("{body}", &doc.body);

    let (model, model_breakdown) = match model_subscores(llm, &prompt, RUBRIC_SYSTEM, DIMENSIONS).await {
        Some(dims) => {
            let avg: f64 = dims.values().sum::<f64>() / dims.len() as f64;
            (avg / 10.0 * MODEL_MAX, json!(dims))
        }
        None => {
            suggestions
                .push("Automated page review unavailable; deterministic signals only.".to_string());
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
            "has_markup": doc.markup.is_some(),
        }),
        suggestions,
    )
}
