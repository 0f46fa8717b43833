//! Keyword-targeting scorer — does the body deliver what the title promises?
//! Purely deterministic: term coverage, repetition band, title shape.

use std::collections::HashMap;

use serde_json::json;

use crate::document::Document;
use crate::scoring::{CategoryScore, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 10.0;

const STOPWORDS: &[&str] = &[
    "with", "and", "the", "for", "our", "your", "this", "that", "will", "from", "into", "role",
    "team", "job", "who", "what", "are", "you",
];

/// Meaningful terms from the title: lowercased words of 4+ chars, stopwords out.
fn title_terms(title: &str) -> Vec<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn occurrences(haystack: &str, term: &str) -> usize {
    haystack.matches(term).count()
}

pub fn score(doc: &Document) -> CategoryScore {
    let terms = title_terms(&doc.title);
    let body_lower = doc.body.to_lowercase();
    let mut suggestions = Vec::new();

    if terms.is_empty() {
        return CategoryScore::new(
            0.0,
            MAX_SCORE,
            json!({ "title_terms": [] }),
            vec!["The title has no meaningful keywords — name the actual role.".to_string()],
        );
    }

    // Coverage: fraction of title terms that appear in the body (0–4 pts).
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for term in &terms {
        counts.insert(term.as_str(), occurrences(&body_lower, term));
    }
    let covered = counts.values().filter(|&&n| n > 0).count();
    let coverage = covered as f64 / terms.len() as f64;
    let coverage_pts = coverage * 4.0;
    if coverage < 0.75 {
        let missing: Vec<&str> = terms
            .iter()
            .map(String::as_str)
            .filter(|t| counts.get(t) == Some(&0))
            .collect();
        suggestions.push(format!(
            "The body never mentions title terms: {}.",
            missing.join(", ")
        ));
    }

    // Repetition band for the most frequent title term (0–3 pts). A healthy
    // posting repeats its core term a few times; zero reads off-topic and
    // a dozen-plus reads like keyword stuffing.
    let top_count = counts.values().copied().max().unwrap_or(0);
    let repetition_pts = match top_count {
        0 => 0.0,
        1 => 1.5,
        2..=8 => 3.0,
        9..=12 => 2.0,
        _ => {
            suggestions.push("The core keyword is repeated excessively — reads as stuffing.".to_string());
            1.0
        }
    };

    // Title shape (0–3 pts): 3–12 words is scannable and search-friendly.
    let title_words = doc.title.split_whitespace().count();
    let title_pts = if (3..=12).contains(&title_words) {
        3.0
    } else if title_words > 0 {
        suggestions.push(if title_words < 3 {
            "The title is too terse — add seniority or specialization.".to_string()
        } else {
            "The title is too long — keep it under a dozen words.".to_string()
        });
        1.5
    } else {
        0.0
    };

    if suggestions.is_empty() {
        suggestions.push(NO_ACTION_NEEDED.to_string());
    }

    CategoryScore::new(
        coverage_pts + repetition_pts + title_pts,
        MAX_SCORE,
        json!({
            "title_terms": terms,
            "coverage": coverage,
            "top_term_count": top_count,
            "title_words": title_words,
        }),
        suggestions,
    )
}
