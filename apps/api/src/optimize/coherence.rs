//! Coherence pass — one whole-document call that unifies tone and transitions
//! after independent per-section rewrites.
//!
//! This pass never fails the request: any error returns the merged draft
//! unchanged with a synthetic change-log entry noting the skip.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::fingerprint::CompanyFingerprint;
use crate::llm_client::json_guard::parse_model_json;
use crate::llm_client::{CompletionOptions, CompletionService};
use crate::optimize::prompts::{COHERENCE_SYSTEM, COHERENCE_TEMPLATE};
use crate::optimize::section::GlobalContext;
use crate::scoring::DerivedFacts;
use crate::tokens::{compute_max_output, estimate_tokens};

const TARGET_TOTAL_TOKENS: u32 = 16_384;
const FALLBACK_TOTAL_TOKENS: u32 = 32_768;
const MIN_OUTPUT_TOKENS: u32 = 512;

static MD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,3}\s+\S").expect("markdown heading regex is valid"));

static HTML_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-4][\s>]").expect("html heading regex is valid"));

#[derive(Debug, Clone)]
pub struct CoherenceOutcome {
    pub optimized_text: String,
    pub change_log: Vec<String>,
    pub unaddressed_items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CoherenceRewrite {
    optimized_text: String,
    #[serde(default)]
    change_log: Vec<String>,
    #[serde(default)]
    unaddressed_items: Vec<String>,
}

fn count_headings(text: &str) -> usize {
    MD_HEADING_RE
        .find_iter(text)
        .count()
        .max(HTML_HEADING_RE.find_iter(text).count())
}

fn skipped(merged: &str, reason: &str) -> CoherenceOutcome {
    warn!("Coherence pass skipped: {reason}");
    CoherenceOutcome {
        optimized_text: merged.to_string(),
        change_log: vec![format!("Coherence pass skipped: {reason}")],
        unaddressed_items: vec![],
    }
}

pub fn build_coherence_prompt(
    merged: &str,
    fingerprint: &CompanyFingerprint,
    ctx: &GlobalContext,
    facts: &DerivedFacts,
) -> String {
    let anchors = if fingerprint.lexical_anchors.is_empty() {
        "(none)".to_string()
    } else {
        fingerprint.lexical_anchors.join(", ")
    };
    let facts_json = json!({
        "location": facts.location.fields,
        "compensation": facts.compensation.fields,
        "jurisdictions": facts.jurisdictions,
    });

    COHERENCE_TEMPLATE
        .replace("{company}", &ctx.company)
        .replace("{tone}", &fingerprint.tone)
        .replace("{anchors}", &anchors)
        .replace("{facts}", &facts_json.to_string())
        .replace("{text}", merged)
}

pub async fn reconcile(
    merged: &str,
    fingerprint: &CompanyFingerprint,
    ctx: &GlobalContext,
    facts: &DerivedFacts,
    llm: &dyn CompletionService,
) -> CoherenceOutcome {
    let prompt = build_coherence_prompt(merged, fingerprint, ctx, facts);
    let prompt_tokens = estimate_tokens(prompt.chars().count(), 1);
    let options = CompletionOptions {
        temperature: Some(0.3),
        response_format_json: true,
        max_output_tokens: Some(compute_max_output(
            prompt_tokens,
            TARGET_TOTAL_TOKENS,
            MIN_OUTPUT_TOKENS,
            FALLBACK_TOTAL_TOKENS,
        )),
        ..CompletionOptions::default()
    };

    let raw = match llm.complete(&prompt, COHERENCE_SYSTEM, &options).await {
        Ok(raw) => raw,
        Err(e) => return skipped(merged, &format!("completion call failed ({e})")),
    };

    let value = match parse_model_json(&raw) {
        Ok(value) => value,
        Err(e) => return skipped(merged, &format!("invalid JSON ({e})")),
    };
    let rewrite: CoherenceRewrite = match serde_json::from_value(value) {
        Ok(rewrite) => rewrite,
        Err(e) => return skipped(merged, &format!("unexpected shape ({e})")),
    };

    if rewrite.optimized_text.trim().is_empty() {
        return skipped(merged, "empty rewrite");
    }

    // Structural-loss check: a dropped heading is suspicious but not fatal.
    let before = count_headings(merged);
    let after = count_headings(&rewrite.optimized_text);
    if after < before {
        warn!("Coherence pass reduced heading count {before} -> {after}");
    }

    CoherenceOutcome {
        optimized_text: rewrite.optimized_text,
        change_log: rewrite.change_log,
        unaddressed_items: rewrite.unaddressed_items,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::extraction::{CompensationFields, Extraction, LocationFields};
    use crate::llm_client::testing::MockCompletion;

    fn fingerprint() -> CompanyFingerprint {
        CompanyFingerprint {
            version: 1,
            section_order: vec!["About".to_string()],
            heading_aliases: BTreeMap::new(),
            tone: "professional".to_string(),
            formatting: "narrative".to_string(),
            lexical_anchors: vec!["Atlas Platform".to_string()],
            selectors: vec![],
            last_seen: Utc::now(),
        }
    }

    fn facts() -> DerivedFacts {
        DerivedFacts {
            location: Extraction::deterministic(LocationFields::default(), 0.0),
            compensation: Extraction::deterministic(CompensationFields::default(), 0.0),
            jurisdictions: vec![],
        }
    }

    fn ctx() -> GlobalContext {
        GlobalContext {
            company: "Acme".to_string(),
            role_title: "Engineer".to_string(),
        }
    }

    const MERGED: &str = "## About\nWe build robots.\n\n## Requirements\n- Rust";

    #[tokio::test]
    async fn test_successful_pass_returns_rewrite() {
        let llm = MockCompletion::repeating(
            r###"{"optimized_text": "## About\nWe build warehouse robots.\n\n## Requirements\n- Rust", "change_log": ["smoothed transition"]}"###,
        );
        let outcome = reconcile(MERGED, &fingerprint(), &ctx(), &facts(), &llm).await;
        assert!(outcome.optimized_text.contains("warehouse robots"));
        assert_eq!(outcome.change_log, vec!["smoothed transition"]);
    }

    #[tokio::test]
    async fn test_call_failure_returns_draft_unchanged() {
        let llm = MockCompletion::failing(500);
        let outcome = reconcile(MERGED, &fingerprint(), &ctx(), &facts(), &llm).await;
        assert_eq!(outcome.optimized_text, MERGED);
        assert!(outcome.change_log[0].contains("skipped"));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_draft_unchanged() {
        let llm = MockCompletion::repeating(r#"{"optimized_text": "truncated"#);
        let outcome = reconcile(MERGED, &fingerprint(), &ctx(), &facts(), &llm).await;
        assert_eq!(outcome.optimized_text, MERGED);
    }

    #[tokio::test]
    async fn test_empty_rewrite_returns_draft_unchanged() {
        let llm = MockCompletion::repeating(r#"{"optimized_text": ""}"#);
        let outcome = reconcile(MERGED, &fingerprint(), &ctx(), &facts(), &llm).await;
        assert_eq!(outcome.optimized_text, MERGED);
    }

    #[test]
    fn test_count_headings_markdown_and_html() {
        assert_eq!(count_headings(MERGED), 2);
        assert_eq!(count_headings("<h2>A</h2><h3>B</h3>plain"), 2);
        assert_eq!(count_headings("no headings"), 0);
    }
}
