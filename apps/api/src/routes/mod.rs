pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::optimize;
use crate::scoring;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/score", post(scoring::handlers::handle_score))
        .route("/api/v1/optimize", post(optimize::handlers::handle_optimize))
        .with_state(state)
}
