//! Scoring — seven category scorers and the weighted rubric aggregator.
//!
//! Flow: derive_facts (location/compensation extraction + jurisdictions) →
//! deterministic scorers as a batch → model-blended scorers concurrently →
//! aggregate into a `ScoreReport`.
//!
//! Scoring never throws for data-quality reasons: every scorer degrades to a
//! fixed neutral score with an explanatory suggestion when its model call
//! fails, and the handler always returns a best-effort report.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub mod cache;
pub mod clarity;
pub mod compensation;
pub mod handlers;
pub mod keywords;
pub mod page_context;
pub mod prompts;
pub mod recency;
pub mod structure;
pub mod structured_data;

use crate::compliance::compute_jurisdictions;
use crate::document::Document;
use crate::extraction::{
    extract_compensation, extract_location, CompensationFields, Extraction, LocationFields,
};
use crate::llm_client::json_guard::parse_model_json;
use crate::llm_client::{CompletionOptions, CompletionService};

/// Suggestion used when a category needs no improvement.
pub const NO_ACTION_NEEDED: &str = "No action needed.";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One category's result. Invariant: `0 <= score <= max_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    pub max_score: f64,
    pub breakdown: Value,
    pub suggestions: Vec<String>,
}

impl CategoryScore {
    pub fn new(score: f64, max_score: f64, breakdown: Value, suggestions: Vec<String>) -> Self {
        Self {
            score: score.clamp(0.0, max_score),
            max_score,
            breakdown,
            suggestions,
        }
    }
}

/// Extraction-derived facts shared by the compensation scorer and the
/// optimization pipeline's schema snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedFacts {
    pub location: Extraction<LocationFields>,
    pub compensation: Extraction<CompensationFields>,
    pub jurisdictions: Vec<String>,
}

/// Per-category weights. Must sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub clarity: u32,
    pub structure: u32,
    pub structured_data: u32,
    pub recency: u32,
    pub keywords: u32,
    pub compensation: u32,
    pub page_context: u32,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            clarity: 20,
            structure: 15,
            structured_data: 10,
            recency: 10,
            keywords: 15,
            compensation: 20,
            page_context: 10,
        }
    }
}

impl CategoryWeights {
    pub fn validate(&self) -> anyhow::Result<()> {
        let sum = self.clarity
            + self.structure
            + self.structured_data
            + self.recency
            + self.keywords
            + self.compensation
            + self.page_context;
        anyhow::ensure!(sum == 100, "category weights must sum to 100, got {sum}");
        Ok(())
    }
}

/// A raw category result paired with its configured weight, in pipeline order.
#[derive(Debug, Clone)]
pub struct ScoredCategory {
    pub name: &'static str,
    pub weight: u32,
    pub raw: CategoryScore,
}

/// The aggregate report. Invariants: `total_score == Σ categories[*].score`,
/// `0 <= total_score <= 100`, red_flags are categories below half their weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total_score: u32,
    pub categories: BTreeMap<String, CategoryScore>,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub feedback: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Weighted rubric aggregator
// ────────────────────────────────────────────────────────────────────────────

/// Rescales each category to its weight, sums the total, and derives
/// flags/recommendations. Pure and synchronous — no I/O.
pub fn aggregate(scored: Vec<ScoredCategory>) -> ScoreReport {
    let mut categories = BTreeMap::new();
    let mut red_flags = Vec::new();
    let mut recommendations = Vec::new();
    let mut total: u32 = 0;

    for entry in scored {
        let weight = entry.weight as f64;
        let rescaled = if entry.raw.max_score > 0.0 {
            (entry.raw.score / entry.raw.max_score * weight).round()
        } else {
            0.0
        }
        .clamp(0.0, weight);

        total += rescaled as u32;

        if rescaled < weight / 2.0 {
            red_flags.push(entry.name.to_string());
        }

        recommendations.extend(
            entry
                .raw
                .suggestions
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned(),
        );

        categories.insert(
            entry.name.to_string(),
            CategoryScore {
                score: rescaled,
                max_score: weight,
                breakdown: entry.raw.breakdown,
                suggestions: entry.raw.suggestions,
            },
        );
    }

    let feedback = build_feedback(total, &red_flags);

    ScoreReport {
        total_score: total,
        categories,
        red_flags,
        recommendations,
        feedback,
    }
}

/// Builds a human-readable summary from the total and flagged categories.
fn build_feedback(total: u32, red_flags: &[String]) -> String {
    if total >= 80 {
        "Strong posting. The document covers the key quality dimensions well.".to_string()
    } else if total >= 60 {
        format!(
            "Decent posting ({total}/100). Focus improvement on: {}.",
            if red_flags.is_empty() {
                "the lowest-scoring categories".to_string()
            } else {
                red_flags.join(", ")
            }
        )
    } else {
        format!(
            "Weak posting ({total}/100). Significant gaps: {}. A rewrite is recommended.",
            if red_flags.is_empty() {
                "multiple categories".to_string()
            } else {
                red_flags.join(", ")
            }
        )
    }
}

/// Rescore guardrail: a post-optimization total may regress by up to
/// `regression_allowance` points when at least one category improved by
/// `category_gain_offset` or more. Thresholds are product policy (config).
pub fn accept_rescore(
    before: &ScoreReport,
    after: &ScoreReport,
    regression_allowance: u32,
    category_gain_offset: u32,
) -> bool {
    if after.total_score >= before.total_score {
        return true;
    }

    let regression = before.total_score - after.total_score;
    if regression > regression_allowance {
        return false;
    }

    after.categories.iter().any(|(name, after_cat)| {
        before
            .categories
            .get(name)
            .map(|before_cat| after_cat.score - before_cat.score >= category_gain_offset as f64)
            .unwrap_or(false)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestration
// ────────────────────────────────────────────────────────────────────────────

/// Runs extraction once and derives jurisdictions. Shared between scoring and
/// the optimization pipeline's schema snapshot.
pub async fn derive_facts(doc: &Document, llm: &dyn CompletionService) -> DerivedFacts {
    let location = extract_location(&doc.body, llm).await;
    let compensation = extract_compensation(&doc.body, llm).await;
    let jurisdictions = compute_jurisdictions(&location.fields);

    DerivedFacts {
        location,
        compensation,
        jurisdictions,
    }
}

/// Scores a document against the full weighted rubric.
///
/// Deterministic-only scorers run as a batch first; the three model-blended
/// scorers are issued concurrently afterwards to limit rate-limit contention.
pub async fn score_document(
    doc: &Document,
    llm: &dyn CompletionService,
    weights: &CategoryWeights,
) -> ScoreReport {
    let facts = derive_facts(doc, llm).await;
    info!(
        "Derived facts: location confidence {:.2} ({:?}), compensation confidence {:.2} ({:?}), {} jurisdiction(s)",
        facts.location.confidence,
        facts.location.source,
        facts.compensation.confidence,
        facts.compensation.source,
        facts.jurisdictions.len()
    );

    // Deterministic batch — no model calls.
    let structured_data = structured_data::score(doc);
    let recency = recency::score(doc, Utc::now().date_naive());
    let keywords = keywords::score(doc);
    let compensation = compensation::score(&facts);

    // Model-blended scorers, concurrently in-flight.
    let (clarity, structure, page_context) = tokio::join!(
        clarity::score(doc, llm),
        structure::score(doc, llm),
        page_context::score(doc, llm),
    );

    aggregate(vec![
        ScoredCategory {
            name: "clarity",
            weight: weights.clarity,
            raw: clarity,
        },
        ScoredCategory {
            name: "structure",
            weight: weights.structure,
            raw: structure,
        },
        ScoredCategory {
            name: "structured_data",
            weight: weights.structured_data,
            raw: structured_data,
        },
        ScoredCategory {
            name: "recency",
            weight: weights.recency,
            raw: recency,
        },
        ScoredCategory {
            name: "keywords",
            weight: weights.keywords,
            raw: keywords,
        },
        ScoredCategory {
            name: "compensation",
            weight: weights.compensation,
            raw: compensation,
        },
        ScoredCategory {
            name: "page_context",
            weight: weights.page_context,
            raw: page_context,
        },
    ])
}

// ────────────────────────────────────────────────────────────────────────────
// Shared model-rubric helper
// ────────────────────────────────────────────────────────────────────────────

/// Asks the model for small integer sub-scores (0–10) per dimension in one
/// constrained JSON call. Returns `None` on any failure so the caller can
/// degrade to its neutral score — never an error.
pub(crate) async fn model_subscores(
    llm: &dyn CompletionService,
    prompt: &str,
    system: &str,
    dimensions: &[&str],
) -> Option<BTreeMap<String, f64>> {
    let options = CompletionOptions {
        temperature: Some(0.0),
        response_format_json: true,
        max_output_tokens: Some(256),
        ..CompletionOptions::default()
    };

    let raw = match llm.complete(prompt, system, &options).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Model rubric call failed: {e}");
            return None;
        }
    };

    let value = match parse_model_json(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Model rubric returned invalid JSON: {e}");
            return None;
        }
    };

    let mut scores = BTreeMap::new();
    for dim in dimensions {
        let score = value.get(dim).and_then(Value::as_u64)?;
        scores.insert((*dim).to_string(), score.min(10) as f64);
    }
    Some(scores)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
