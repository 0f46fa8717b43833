//! Structured-data scorer — JSON-LD / meta-tag presence. Purely deterministic.

use serde_json::json;

use crate::document::Document;
use crate::scoring::{CategoryScore, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 5.0;

pub fn score(doc: &Document) -> CategoryScore {
    let Some(markup) = doc.markup.as_deref() else {
        return CategoryScore::new(
            0.0,
            MAX_SCORE,
            json!({ "markup": false }),
            vec![
                "No page markup available — serve the posting with JSON-LD JobPosting markup \
                 so job boards and search engines can index it."
                    .to_string(),
            ],
        );
    };

    let mut score = 0.0_f64;
    let mut suggestions = Vec::new();

    let has_ld_json = markup.contains("application/ld+json");
    let has_job_posting = markup.contains("\"JobPosting\"") || markup.contains("'JobPosting'");
    let has_meta = markup.contains("og:title")
        || markup.contains("og:description")
        || markup.contains("name=\"description\"");

    if has_ld_json {
        score += 2.0;
    } else {
        suggestions.push("Add a JSON-LD <script> block to the page.".to_string());
    }

    if has_job_posting {
        score += 2.0;
    } else {
        suggestions.push("Declare schema.org JobPosting structured data.".to_string());
    }

    if has_meta {
        score += 1.0;
    } else {
        suggestions.push("Add OpenGraph/description meta tags for link previews.".to_string());
    }

    if suggestions.is_empty() {
        suggestions.push(NO_ACTION_NEEDED.to_string());
    }

    CategoryScore::new(
        score,
        MAX_SCORE,
        json!({
            "markup": true,
            "ld_json": has_ld_json,
            "job_posting": has_job_posting,
            "meta_tags": has_meta,
        }),
        suggestions,
    )
}
