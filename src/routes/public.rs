use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Liveness endpoints. The resolver treats both paths as infrastructure, so a valid
/// token is all they need.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        .route("/", get(handlers::root))
        // GET /health
        // Used by load balancer checks.
        .route("/health", get(handlers::health))
}
