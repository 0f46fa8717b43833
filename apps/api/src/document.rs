//! The immutable job-posting document the pipeline consumes.
//!
//! Herald makes no assumptions about how the document was obtained (live
//! scrape vs stored text vs upload) — the routing layer supplies it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Raw job-posting input. `markup` is optional; its presence changes the
/// extraction and segmentation strategy (markup headings are preferred).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub markup: Option<String>,
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));

/// Reduces an HTML fragment to its visible text. Good enough for heading and
/// section content; Herald is not a general HTML sanitizer.
pub fn strip_tags(markup: &str) -> String {
    let text = TAG_RE.replace_all(markup, " ");
    let decoded = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_flattens_markup() {
        let html = "<h2>Benefits &amp; Perks</h2><ul><li>Health</li><li>Dental</li></ul>";
        assert_eq!(strip_tags(html), "Benefits & Perks Health Dental");
    }

    #[test]
    fn test_strip_tags_plain_text_unchanged() {
        assert_eq!(strip_tags("no markup here"), "no markup here");
    }

    #[test]
    fn test_document_markup_defaults_to_none() {
        let doc: Document =
            serde_json::from_str(r#"{"title": "Engineer", "body": "text"}"#).unwrap();
        assert!(doc.markup.is_none());
    }
}
