//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, revocation_status_handler, revoke_handler, stats_handler, webhook_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /api/space/webhook` - Verified webhook intake
/// - `POST /api/auth/revoke` - Revoke a token by id
/// - `GET /api/auth/revoked/:jti` - Check a token id
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/space/webhook", post(webhook_handler))
        .route("/api/auth/revoke", post(revoke_handler))
        .route("/api/auth/revoked/:jti", get(revocation_status_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
