//! Optimization pipeline — fingerprint → segment → concurrent per-section
//! rewrite → merge → coherence pass.
//!
//! Section calls are issued as one concurrent batch; any section failure
//! aborts the rewrite (the caller keeps the unoptimized text). The coherence
//! pass strictly follows the merged output and is content-preserving on
//! failure.

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub mod coherence;
pub mod handlers;
pub mod prompts;
pub mod section;
pub mod segmenter;

use crate::document::Document;
use crate::errors::AppError;
use crate::fingerprint::{ensure_fingerprint, CompanyFingerprint, FingerprintStore};
use crate::llm_client::CompletionService;
use crate::scoring::derive_facts;
use section::{optimize_section, GlobalContext};
use segmenter::{merge, segment};

/// The rewrite output returned to the caller, who owns persistence and
/// versioning.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub id: Uuid,
    pub optimized_text: String,
    pub change_log: Vec<String>,
    pub unaddressed_items: Vec<String>,
    pub fingerprint: CompanyFingerprint,
    /// Extracted location/compensation facts for the downstream structured-data
    /// emitter.
    pub schema_snapshot: serde_json::Value,
}

pub async fn optimize_document(
    doc: &Document,
    company: &str,
    store: &dyn FingerprintStore,
    llm: &dyn CompletionService,
    chunk_limit: usize,
) -> Result<OptimizationResult, AppError> {
    let fingerprint = ensure_fingerprint(store, company, doc).await?;
    let facts = derive_facts(doc, llm).await;

    let sections = segment(doc, &fingerprint, chunk_limit);
    info!(
        "Optimizing {} section(s) for '{company}' (fingerprint v{})",
        sections.len(),
        fingerprint.version
    );

    let ctx = GlobalContext {
        company: company.to_string(),
        role_title: doc.title.clone(),
    };

    let optimized = try_join_all(
        sections
            .iter()
            .map(|s| optimize_section(s, &fingerprint, &ctx, llm)),
    )
    .await?;

    let merged = merge(&optimized, &fingerprint);

    let mut change_log: Vec<String> = Vec::new();
    let mut unaddressed_items: Vec<String> = Vec::new();
    for section in &optimized {
        change_log.extend(section.change_log.iter().cloned());
        unaddressed_items.extend(section.unaddressed_items.iter().cloned());
    }

    let outcome = coherence::reconcile(&merged, &fingerprint, &ctx, &facts, llm).await;
    change_log.extend(outcome.change_log);
    unaddressed_items.extend(outcome.unaddressed_items);

    let schema_snapshot = json!({
        "location": facts.location,
        "compensation": facts.compensation,
        "jurisdictions": facts.jurisdictions,
    });

    Ok(OptimizationResult {
        id: Uuid::new_v4(),
        optimized_text: outcome.optimized_text,
        change_log,
        unaddressed_items,
        fingerprint,
        schema_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::testing::MemoryFingerprintStore;
    use crate::llm_client::testing::MockCompletion;

    // High-confidence location and compensation lines keep the extractors on
    // their deterministic path, so the mock script only sees rewrite calls.
    const BODY: &str = "## About Us\nWe build robots. Location: San Francisco, CA\n\
        ## Requirements\n- Rust\n- $150,000 - $180,000 per year";

    fn doc() -> Document {
        Document {
            title: "Senior Rust Engineer".to_string(),
            body: BODY.to_string(),
            markup: None,
        }
    }

    fn rewrite_json(text: &str) -> String {
        format!(
            r#"{{"optimized_text": "{text}", "change_log": ["edited"], "unaddressed_items": []}}"#
        )
    }

    #[tokio::test]
    async fn test_full_pipeline_produces_result() {
        let store = MemoryFingerprintStore::default();
        let llm = MockCompletion::repeating(&rewrite_json("Rewritten section."));

        let result = optimize_document(&doc(), "Acme Robotics", &store, &llm, 6000)
            .await
            .unwrap();

        assert!(!result.optimized_text.is_empty());
        assert!(result.change_log.iter().any(|c| c == "edited"));
        assert_eq!(result.fingerprint.version, 1);
        assert_eq!(result.schema_snapshot["location"]["fields"]["state"], "CA");
        assert!(result.schema_snapshot["jurisdictions"]
            .as_array()
            .unwrap()
            .iter()
            .any(|j| j.as_str().unwrap().contains("California")));
    }

    #[tokio::test]
    async fn test_section_failure_aborts_rewrite() {
        let store = MemoryFingerprintStore::default();
        // First section call succeeds, the second fails hard.
        let llm = MockCompletion::scripted(vec![
            Ok(rewrite_json("First section.")),
            Err(400),
            Err(400),
            Err(400),
        ]);

        let result = optimize_document(&doc(), "Acme", &store, &llm, 6000).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_coherence_failure_keeps_merged_draft() {
        let store = MemoryFingerprintStore::default();
        // Two section rewrites succeed, the coherence call fails; the final
        // text must equal the merged draft of the section rewrites.
        let llm = MockCompletion::scripted(vec![
            Ok(rewrite_json("About rewritten.")),
            Ok(rewrite_json("Requirements rewritten.")),
            Err(500),
        ]);

        let result = optimize_document(&doc(), "Acme", &store, &llm, 6000)
            .await
            .unwrap();
        assert_eq!(
            result.optimized_text,
            "About rewritten.\n\nRequirements rewritten."
        );
        assert!(result
            .change_log
            .iter()
            .any(|c| c.contains("Coherence pass skipped")));
    }
}
