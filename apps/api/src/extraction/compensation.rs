//! Compensation extractor — deterministic currency/range grammar with a gated
//! model fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extraction::prompts::{
    excerpt, COMPENSATION_EXTRACT_PROMPT_TEMPLATE, COMPENSATION_EXTRACT_SYSTEM,
};
use crate::extraction::{
    Extraction, MODEL_CONFIDENCE_FLOOR, MODEL_CONFIDENCE_FLOOR_COMPLETE, MODEL_FALLBACK_THRESHOLD,
};
use crate::llm_client::json_guard::parse_model_json;
use crate::llm_client::{CompletionOptions, CompletionService};

const FALLBACK_EXCERPT_CHARS: usize = 4000;

/// Extracted compensation facts. A matched range and a single amount are
/// mutually exclusive: `is_range` implies both `min` and `max` are set, a
/// single amount lands in `min` with `max` empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensationFields {
    pub currency: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub is_range: bool,
    pub pay_period: Option<String>,
    #[serde(default)]
    pub vague_terms: Vec<String>,
}

const NUM: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?";

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)([$£€])?\s*({NUM})\s*(k)?\s*(?:[-\u{{2013}}\u{{2014}}]|\bto\b)\s*([$£€])?\s*({NUM})\s*(k)?"
    ))
    .expect("range regex is valid")
});

// A single amount must carry a currency symbol — bare numbers ("3 years",
// "500 employees") are not compensation.
static SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)([$£€])\s*({NUM})\s*(k)?")).expect("single amount regex is valid")
});

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:per\s+|/\s*)(year|annum|yr|month|mo|week|wk|hour|hr)\b")
        .expect("period regex is valid")
});

static PERIOD_ADVERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(annually|yearly|monthly|weekly|hourly)\b")
        .expect("period adverb regex is valid")
});

static VAGUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(competitive|DOE|depends on experience|negotiable|market rate|commensurate with experience)\b")
        .expect("vague terms regex is valid")
});

/// Strips thousands separators and applies the `k` suffix (×1000).
fn parse_amount(raw: &str, k_suffix: bool) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let value: f64 = cleaned.parse().ok()?;
    Some(if k_suffix { value * 1000.0 } else { value })
}

fn currency_for_symbol(symbol: &str) -> &'static str {
    match symbol {
        "£" => "GBP",
        "€" => "EUR",
        _ => "USD",
    }
}

fn normalize_period(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "year" | "annum" | "yr" | "annually" | "yearly" => "year",
        "month" | "mo" | "monthly" => "month",
        "week" | "wk" | "weekly" => "week",
        _ => "hour",
    }
}

/// A dash-joined number pair is only a pay range when it looks like money:
/// a currency symbol on either side, `k` suffixes, or salary-sized figures.
/// Otherwise "3-5 years" would match.
fn plausible_range(caps: &regex::Captures<'_>, min: f64, max: f64) -> bool {
    caps.get(1).is_some()
        || caps.get(4).is_some()
        || (caps.get(3).is_some() && caps.get(6).is_some())
        || (min >= 1000.0 && max >= 1000.0)
}

/// Deterministic pass: regex scan over the body.
pub fn scan_compensation(body: &str) -> (CompensationFields, f32) {
    let mut fields = CompensationFields::default();

    let range = RANGE_RE.captures_iter(body).find_map(|caps| {
        let min = parse_amount(&caps[2], caps.get(3).is_some())?;
        let max = parse_amount(&caps[5], caps.get(6).is_some())?;
        if !plausible_range(&caps, min, max) {
            return None;
        }
        let symbol = caps.get(1).or_else(|| caps.get(4));
        Some((min, max, symbol.map(|m| m.as_str().to_string())))
    });

    if let Some((min, max, symbol)) = range {
        fields.is_range = true;
        fields.min = Some(min.min(max));
        fields.max = Some(min.max(max));
        fields.currency = symbol.as_deref().map(|s| currency_for_symbol(s).to_string());
    } else if let Some(caps) = SINGLE_RE.captures(body) {
        // Single amount — mutually exclusive with a range match.
        fields.min = parse_amount(&caps[2], caps.get(3).is_some());
        fields.currency = Some(currency_for_symbol(&caps[1]).to_string());
    }

    if let Some(caps) = PERIOD_RE.captures(body) {
        fields.pay_period = Some(normalize_period(&caps[1]).to_string());
    } else if let Some(caps) = PERIOD_ADVERB_RE.captures(body) {
        fields.pay_period = Some(normalize_period(&caps[1]).to_string());
    }

    fields.vague_terms = VAGUE_RE
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .collect();

    let confidence = compensation_confidence(&fields);
    (fields, confidence)
}

/// Fixed point-weighted confidence rubric: numeric range, currency, and pay
/// period each contribute fixed weights; vague terms subtract.
fn compensation_confidence(fields: &CompensationFields) -> f32 {
    let mut score = 0.0_f32;
    if fields.is_range {
        score += 0.4;
    } else if fields.min.is_some() {
        score += 0.25;
    }
    if fields.currency.is_some() {
        score += 0.2;
    }
    if fields.pay_period.is_some() {
        score += 0.2;
    }
    if !fields.vague_terms.is_empty() {
        score -= 0.3;
    }
    score.clamp(0.0, 1.0)
}

/// Extracts compensation with the heuristic-then-model strategy.
/// Never fails: on model error the deterministic (possibly empty) result stands.
pub async fn extract_compensation(
    body: &str,
    llm: &dyn CompletionService,
) -> Extraction<CompensationFields> {
    let (fields, confidence) = scan_compensation(body);
    let deterministic = Extraction::deterministic(fields, confidence);

    if deterministic.confidence >= MODEL_FALLBACK_THRESHOLD {
        return deterministic;
    }

    debug!(
        "Compensation confidence {:.2} below threshold — invoking model fallback",
        deterministic.confidence
    );

    match model_fallback(body, llm).await {
        Ok(model_fields) => merge_model_fields(deterministic, model_fields),
        Err(e) => {
            warn!("Compensation model fallback failed, keeping deterministic result: {e}");
            deterministic
        }
    }
}

async fn model_fallback(
    body: &str,
    llm: &dyn CompletionService,
) -> Result<CompensationFields, anyhow::Error> {
    let prompt = COMPENSATION_EXTRACT_PROMPT_TEMPLATE
        .replace("{body}", excerpt(body, FALLBACK_EXCERPT_CHARS));
    let options = CompletionOptions {
        temperature: Some(0.0),
        response_format_json: true,
        max_output_tokens: Some(512),
        ..CompletionOptions::default()
    };

    let raw = llm
        .complete(&prompt, COMPENSATION_EXTRACT_SYSTEM, &options)
        .await?;
    let value = parse_model_json(&raw)?;
    Ok(serde_json::from_value(value)?)
}

/// Merges model fields only where the deterministic pass found nothing, then
/// recomputes confidence and raises it to the model floor.
fn merge_model_fields(
    deterministic: Extraction<CompensationFields>,
    model: CompensationFields,
) -> Extraction<CompensationFields> {
    let mut merged = deterministic;

    if merged.fields.min.is_none() && merged.fields.max.is_none() {
        merged.fields.min = model.min;
        merged.fields.max = model.max;
        merged.fields.is_range = model.is_range && model.min.is_some() && model.max.is_some();
    }
    if merged.fields.currency.is_none() {
        merged.fields.currency = model.currency;
    }
    if merged.fields.pay_period.is_none() {
        merged.fields.pay_period = model.pay_period;
    }
    if merged.fields.vague_terms.is_empty() {
        merged.fields.vague_terms = model.vague_terms;
    }

    merged.confidence = merged
        .confidence
        .max(compensation_confidence(&merged.fields));

    let floor = if merged.fields.min.is_some() && merged.fields.max.is_some() {
        MODEL_CONFIDENCE_FLOOR_COMPLETE
    } else {
        MODEL_CONFIDENCE_FLOOR
    };
    merged.into_model_merged(floor)
}
