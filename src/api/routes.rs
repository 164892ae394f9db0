//! HTTP API route definitions.

use std::time::Duration;

use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{health, metrics, openapi, status, AppState};
use super::middleware::log_requests;

/// Create the API router.
///
/// Layer order, outermost first: request logging, request timeout, routes.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(health))
        // Status endpoint
        .route("/api/v1/status", get(status))
        .route("/api-docs/openapi.json", get(openapi));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics));
    }

    router
        .layer(request_timeout_layer(state.request_timeout))
        .layer(from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

/// Abort requests that run past `timeout` with `408 Request Timeout`.
fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}
