//! Location extractor — deterministic line scan with a gated model fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extraction::prompts::{excerpt, LOCATION_EXTRACT_PROMPT_TEMPLATE, LOCATION_EXTRACT_SYSTEM};
use crate::extraction::{
    Extraction, MODEL_CONFIDENCE_FLOOR, MODEL_CONFIDENCE_FLOOR_COMPLETE, MODEL_FALLBACK_THRESHOLD,
};
use crate::llm_client::json_guard::parse_model_json;
use crate::llm_client::{CompletionOptions, CompletionService};

const FALLBACK_EXCERPT_CHARS: usize = 4000;

/// Extracted location facts. Everything optional — an empty result is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFields {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub hybrid: bool,
}

impl LocationFields {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && !self.remote
            && !self.hybrid
    }
}

// "City, ST" pairs. The ST token is validated against USPS codes below to
// avoid matching abbreviations like "AI" or "IT".
static CITY_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][A-Za-z.'\-]*(?: [A-Z][A-Za-z.'\-]*)*),\s*([A-Z]{2})\b")
        .expect("city/state regex is valid")
});

static REMOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:remote|work from home|wfh|fully distributed)\b")
        .expect("remote regex is valid")
});

static HYBRID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhybrid\b").expect("hybrid regex is valid"));

static COUNTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(united states|u\.s\.a?\.?|usa|united kingdom|canada)\b")
        .expect("country regex is valid")
});

static LOCATION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:location|based in|office|where you'?ll work)\s*[:\u{2013}-]")
        .expect("location label regex is valid")
});

const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

fn is_us_state_code(code: &str) -> bool {
    US_STATE_CODES.contains(&code)
}

fn normalize_country(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.contains("kingdom") {
        "GB"
    } else if lower.contains("canada") {
        "CA"
    } else {
        "US"
    }
}

/// Deterministic pass: regex scan over the body.
pub fn scan_location(body: &str) -> (LocationFields, f32) {
    let mut fields = LocationFields::default();

    if let Some(caps) = CITY_STATE_RE
        .captures_iter(body)
        .find(|c| is_us_state_code(&c[2]))
    {
        fields.city = Some(caps[1].trim().to_string());
        fields.state = Some(caps[2].to_string());
        fields.country = Some("US".to_string());
    }

    fields.remote = REMOTE_RE.is_match(body);
    fields.hybrid = HYBRID_RE.is_match(body);

    if fields.country.is_none() {
        if let Some(caps) = COUNTRY_RE.captures(body) {
            fields.country = Some(normalize_country(&caps[1]).to_string());
        }
    }

    let confidence = location_confidence(&fields, LOCATION_LABEL_RE.is_match(body));
    (fields, confidence)
}

/// Fixed point-weighted confidence rubric, shared by the deterministic pass
/// and the post-merge recomputation.
fn location_confidence(fields: &LocationFields, has_location_label: bool) -> f32 {
    let mut score = 0.0_f32;
    if fields.city.is_some() && fields.state.is_some() {
        score += 0.5;
    } else if fields.state.is_some() || fields.city.is_some() {
        score += 0.25;
    }
    if fields.remote || fields.hybrid {
        score += 0.2;
    }
    if fields.country.is_some() {
        score += 0.1;
    }
    if has_location_label {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// Extracts the work location with the heuristic-then-model strategy.
/// Never fails: on model error the deterministic (possibly empty) result stands.
pub async fn extract_location(
    body: &str,
    llm: &dyn CompletionService,
) -> Extraction<LocationFields> {
    let (fields, confidence) = scan_location(body);
    let deterministic = Extraction::deterministic(fields, confidence);

    if deterministic.confidence >= MODEL_FALLBACK_THRESHOLD {
        return deterministic;
    }

    debug!(
        "Location confidence {:.2} below threshold — invoking model fallback",
        deterministic.confidence
    );

    match model_fallback(body, llm).await {
        Ok(model_fields) => merge_model_fields(deterministic, model_fields, body),
        Err(e) => {
            warn!("Location model fallback failed, keeping deterministic result: {e}");
            deterministic
        }
    }
}

async fn model_fallback(
    body: &str,
    llm: &dyn CompletionService,
) -> Result<LocationFields, anyhow::Error> {
    let prompt = LOCATION_EXTRACT_PROMPT_TEMPLATE
        .replace("{body}", excerpt(body, FALLBACK_EXCERPT_CHARS));
    let options = CompletionOptions {
        temperature: Some(0.0),
        response_format_json: true,
        max_output_tokens: Some(512),
        ..CompletionOptions::default()
    };

    let raw = llm
        .complete(&prompt, LOCATION_EXTRACT_SYSTEM, &options)
        .await?;
    let value = parse_model_json(&raw)?;
    Ok(serde_json::from_value(value)?)
}

/// Merges model fields only where the deterministic pass found nothing, then
/// recomputes confidence and raises it to the model floor.
fn merge_model_fields(
    deterministic: Extraction<LocationFields>,
    model: LocationFields,
    body: &str,
) -> Extraction<LocationFields> {
    let mut merged = deterministic;

    if merged.fields.city.is_none() {
        merged.fields.city = model.city;
    }
    if merged.fields.state.is_none() {
        merged.fields.state = model.state;
    }
    if merged.fields.country.is_none() {
        merged.fields.country = model.country;
    }
    merged.fields.remote |= model.remote;
    merged.fields.hybrid |= model.hybrid;

    merged.confidence = merged
        .confidence
        .max(location_confidence(&merged.fields, LOCATION_LABEL_RE.is_match(body)));

    let floor = if merged.fields.city.is_some() && merged.fields.state.is_some() {
        MODEL_CONFIDENCE_FLOOR_COMPLETE
    } else {
        MODEL_CONFIDENCE_FLOOR
    };
    merged.into_model_merged(floor)
}
