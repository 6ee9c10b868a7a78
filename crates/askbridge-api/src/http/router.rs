//! Axum router configuration with middleware.
//!
//! Three routes: the long-lived answer channel (`/ws/answer`), the one-shot
//! configuration-open control message (`/control/options`), and a health
//! check. Middleware: CORS and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/answer", get(handlers::ws::ws_handler))
        .route("/control/options", post(handlers::control::open_options))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe.
async fn health_check() -> &'static str {
    "ok"
}
