mod compliance;
mod config;
mod db;
mod document;
mod errors;
mod extraction;
mod fingerprint;
mod llm_client;
mod optimize;
mod routes;
mod scoring;
mod state;
mod tokens;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::fingerprint::PgFingerprintStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::cache::{ScoreCache, SystemClock};
use crate::scoring::CategoryWeights;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // CARGO_CRATE_NAME matches the tracing target (hyphens become underscores).
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Herald API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (backs the fingerprint store)
    let db = create_pool(&config.database_url).await?;
    let fingerprints = Arc::new(PgFingerprintStore::new(db));
    info!("Fingerprint store initialized");

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Rubric weights are fixed at the defaults; the validation guards edits.
    let weights = CategoryWeights::default();
    weights.validate()?;

    let score_cache = Arc::new(ScoreCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_capacity,
        Box::new(SystemClock),
    ));

    // Build app state
    let state = AppState {
        llm,
        config: config.clone(),
        weights,
        fingerprints,
        score_cache,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
