//! Structure scorer — headings, bullets, and a model grouping rubric.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::document::Document;
use crate::llm_client::CompletionService;
use crate::scoring::prompts::{RUBRIC_SYSTEM, STRUCTURE_RUBRIC_TEMPLATE};
use crate::scoring::{model_subscores, CategoryScore, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 10.0;
const MODEL_MAX: f64 = 5.0;
const NEUTRAL_MODEL_SCORE: f64 = 2.5;

const DIMENSIONS: &[&str] = &["grouping", "ordering", "completeness"];

static MD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,3}\s+\S").expect("markdown heading regex is valid"));

static HTML_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-3][\s>]").expect("html heading regex is valid"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+\.)\s+\S").expect("bullet regex is valid"));

/// Counts section headings across body markdown and markup.
pub fn heading_count(doc: &Document) -> usize {
    let md = MD_HEADING_RE.find_iter(&doc.body).count();
    let html = doc
        .markup
        .as_deref()
        .map(|m| HTML_HEADING_RE.find_iter(m).count())
        .unwrap_or(0);
    md.max(html)
}

fn deterministic_score(doc: &Document) -> (f64, Vec<String>) {
    let mut score = 0.0_f64;
    let mut suggestions = Vec::new();

    let headings = heading_count(doc);
    match headings {
        0 => suggestions
            .push("Add section headings (About, Responsibilities, Requirements...).".to_string()),
        1 | 2 => {
            score += 1.0;
            suggestions.push("Split the posting into more sections.".to_string());
        }
        _ => score += 2.0,
    }

    let bullets = BULLET_RE.find_iter(&doc.body).count();
    if bullets >= 3 {
        score += 1.0;
    } else {
        suggestions.push("Use bullet lists for responsibilities and requirements.".to_string());
    }

    let len = doc.body.chars().count();
    if (400..=8000).contains(&len) {
        score += 1.0;
    } else if len < 400 {
        suggestions.push("The posting is very short — candidates need more detail.".to_string());
    } else {
        suggestions.push("The posting is very long — trim to the essentials.".to_string());
    }

    if !doc.title.trim().is_empty() {
        score += 1.0;
    } else {
        suggestions.push("Add a role title.".to_string());
    }

    (score, suggestions)
}

pub async fn score(doc: &Document, llm: &dyn CompletionService) -> CategoryScore {
    let (det, mut suggestions) = deterministic_score(doc);

    let prompt = STRUCTURE_RUBRIC_TEMPLATE
        .replace("{title}", &doc.title)
        .replace("{body}", &doc.body);

    let (model, model_breakdown) = match model_subscores(llm, &prompt, RUBRIC_SYSTEM, DIMENSIONS).await {
        Some(dims) => {
            let avg: f64 = dims.values().sum::<f64>() / dims.len() as f64;
            (avg / 10.0 * MODEL_MAX, json!(dims))
        }
        None => {
            suggestions
                .push("Automated structure review unavailable; deterministic signals only.".to_string());
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
            "headings": heading_count(doc),
        }),
        suggestions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::MockCompletion;

    const STRUCTURED_BODY: &str = "Intro paragraph about the company and why the role exists, with enough detail to set context for a candidate reading quickly.\n\n## About Us\nWe build data infrastructure used by thousands of teams worldwide.\n\n## Responsibilities\n- Design storage systems\n- Own the compaction pipeline\n- Review code from peers\n\n## Requirements\n- 5+ years systems programming\n- Production Rust experience\n\n## Benefits\n- Health coverage\n- Annual learning budget\n";

    fn doc(body: &str) -> Document {
        Document {
            title: "Senior Rust Engineer".to_string(),
            body: body.to_string(),
            markup: None,
        }
    }

    #[test]
    fn test_heading_count_markdown() {
        assert_eq!(heading_count(&doc(STRUCTURED_BODY)), 4);
    }

    #[test]
    fn test_heading_count_prefers_markup_when_richer() {
        let d = Document {
            title: "T".to_string(),
            body: "plain text".to_string(),
            markup: Some("<h1>A</h1><h2>B</h2><h2>C</h2>".to_string()),
        };
        assert_eq!(heading_count(&d), 3);
    }

    #[tokio::test]
    async fn test_well_structured_posting_scores_high() {
        let llm = MockCompletion::repeating(r#"{"grouping": 9, "ordering": 9, "completeness": 8}"#);
        let result = score(&doc(STRUCTURED_BODY), &llm).await;
        assert!(result.score >= 8.0, "score was {}", result.score);
    }

    #[tokio::test]
    async fn test_wall_of_text_flagged() {
        let llm = MockCompletion::repeating(r#"{"grouping": 3, "ordering": 4, "completeness": 3}"#);
        let result = score(&doc("Just one long paragraph describing everything."), &llm).await;
        assert!(result.score < 6.0);
        assert!(result.suggestions.iter().any(|s| s.contains("headings")));
    }

    #[tokio::test]
    async fn test_model_failure_keeps_deterministic_half() {
        let llm = MockCompletion::failing(429);
        let result = score(&doc(STRUCTURED_BODY), &llm).await;
        assert_eq!(result.score, 5.0 + NEUTRAL_MODEL_SCORE);
    }
}
