pub mod health;

use axum::{routing::get, Router};

use crate::state::AppState;
use crate::summaries::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/summaries", get(handlers::handle_list_summaries))
        .with_state(state)
}
