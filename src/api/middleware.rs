//! Request logging middleware.

use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use super::handlers::AppState;
use crate::metrics;

/// Time budget of the current request, inserted into request extensions
/// before any handler runs.
///
/// The request future is dropped once the budget runs out, so handlers only
/// need this when they want to size their own work to what is left.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline {
    started: Instant,
    budget: Duration,
}

impl RequestDeadline {
    /// Start a deadline of `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Total budget for the request.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left before the request is cancelled.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// Whether the budget has been used up.
    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }
}

/// Logs every request on entry and completion and records request metrics.
///
/// Must stay the outermost layer so timeouts and not-found responses are
/// logged too.
pub async fn log_requests(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    state
        .logger
        .in_scope(|| info!(method = %method, path = %path, "request started"));

    request
        .extensions_mut()
        .insert(RequestDeadline::new(state.request_timeout));

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = start.elapsed();
    state.logger.in_scope(|| {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed = ?elapsed,
            "request completed"
        )
    });
    metrics::record_http_request(start, method.as_str(), &endpoint, status.as_u16());

    response
}
