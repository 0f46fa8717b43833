//! Confidence-Scored Field Extractors — location and compensation.
//!
//! Both extractors run a cheap deterministic pass first and compute a
//! confidence score from a fixed point-weighted rubric. Only when confidence
//! falls below `MODEL_FALLBACK_THRESHOLD` is the completion service invoked
//! with a narrow, schema-constrained extraction prompt. Free-text LLM calls are
//! the dominant cost/latency driver; the gate skips them whenever cheap pattern
//! matching is already reliable.
//!
//! Model failure is never an error here — the (possibly empty) deterministic
//! result is kept and callers degrade to neutral scoring.

use serde::{Deserialize, Serialize};

pub mod compensation;
pub mod location;
pub mod prompts;

pub use compensation::{extract_compensation, CompensationFields};
pub use location::{extract_location, LocationFields};

/// Deterministic confidence below this triggers the model fallback.
pub const MODEL_FALLBACK_THRESHOLD: f32 = 0.5;

/// Confidence floor after a model merge.
pub const MODEL_CONFIDENCE_FLOOR: f32 = 0.6;
/// Raised floor when the merge yields a complete pair (city+state or min+max).
pub const MODEL_CONFIDENCE_FLOOR_COMPLETE: f32 = 0.8;

/// Provenance tag on every derived field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Deterministic,
    Model,
}

/// A confidence-bounded, auditable extraction result.
///
/// Invariants: `source == Model` only when the deterministic confidence was
/// below the fallback threshold; confidence is recomputed after any model merge,
/// is monotonically non-decreasing across it, and never exceeds 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction<T> {
    pub fields: T,
    pub confidence: f32,
    pub source: ExtractionSource,
}

impl<T> Extraction<T> {
    pub fn deterministic(fields: T, confidence: f32) -> Self {
        Self {
            fields,
            confidence: confidence.clamp(0.0, 1.0),
            source: ExtractionSource::Deterministic,
        }
    }

    /// Tags the extraction as model-merged, raising confidence to `floor`
    /// without ever lowering what the deterministic pass already earned.
    pub fn into_model_merged(mut self, floor: f32) -> Self {
        self.confidence = self.confidence.max(floor).min(1.0);
        self.source = ExtractionSource::Model;
        self
    }
}
