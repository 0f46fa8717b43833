use std::sync::Arc;

use crate::config::Config;
use crate::fingerprint::FingerprintStore;
use crate::llm_client::CompletionService;
use crate::scoring::cache::ScoreCache;
use crate::scoring::CategoryWeights;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Completion service behind a trait so tests swap in a scripted mock.
    pub llm: Arc<dyn CompletionService>,
    pub config: Config,
    /// Rubric weights, validated to sum to 100 at startup.
    pub weights: CategoryWeights,
    pub fingerprints: Arc<dyn FingerprintStore>,
    pub score_cache: Arc<ScoreCache>,
}
