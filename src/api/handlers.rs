//! HTTP API handlers.

use std::ffi::OsString;
use std::io;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use super::docs::ApiDoc;
use super::json::{FailurePolicy, JsonWriter};
use crate::config::Config;
use crate::logging::Logger;

/// Service version reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hostname reported when the lookup fails.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Application state shared with handlers. Read-only after construction.
#[derive(Clone)]
pub struct AppState {
    /// Logger for handlers and middleware.
    pub logger: Logger,
    /// Response writer.
    pub json: JsonWriter,
    /// Per-request time budget.
    pub request_timeout: Duration,
    /// Prometheus handle; `/metrics` is routed only when present.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(logger: Logger, config: &Config) -> Self {
        Self {
            json: JsonWriter::new(logger.clone()),
            logger,
            request_timeout: config.api_timeout,
            metrics: None,
        }
    }

    /// Expose Prometheus metrics through `handle`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Change what happens when a response fails to encode.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.json = self.json.with_policy(policy);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok".
    #[schema(example = "ok")]
    pub status: &'static str,
    /// Time the response was built.
    pub timestamp: DateTime<Utc>,
    /// Host serving the request, or "unknown".
    pub hostname: String,
    /// Service version.
    #[schema(example = "1.0.0")]
    pub version: &'static str,
}

/// Status response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Always "operational".
    #[schema(example = "operational")]
    pub status: &'static str,
    /// Time the response was built.
    pub timestamp: DateTime<Utc>,
    /// Backing services.
    pub services: ServiceStatus,
}

/// Backing service states in the status response.
///
/// These are fixed values; no connection is attempted.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    /// Database state.
    #[schema(example = "connected")]
    pub database: &'static str,
    /// Cache state.
    #[schema(example = "connected")]
    pub cache: &'static str,
}

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Response {
    let hostname = resolve_hostname(&state.logger, hostname::get);

    let response = HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        hostname,
        version: VERSION,
    };

    state.logger.in_scope(|| info!("health check performed"));
    state.json.write(&response, StatusCode::OK)
}

/// Status handler - always returns 200 with fixed service states.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "status",
    responses((status = 200, description = "Service status", body = StatusResponse))
)]
pub async fn status(State(state): State<AppState>) -> Response {
    let response = StatusResponse {
        status: "operational",
        timestamp: Utc::now(),
        services: ServiceStatus {
            database: "connected",
            cache: "connected",
        },
    };

    state.json.write(&response, StatusCode::OK)
}

/// Prometheus metrics handler.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// OpenAPI document handler.
pub async fn openapi(State(state): State<AppState>) -> Response {
    state.json.write(&ApiDoc::openapi(), StatusCode::OK)
}

/// Resolve the host name with `lookup`, falling back to [`UNKNOWN_HOSTNAME`]
/// when it fails or comes back empty.
pub fn resolve_hostname<F>(logger: &Logger, lookup: F) -> String
where
    F: FnOnce() -> io::Result<OsString>,
{
    match lookup() {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        Ok(_) => {
            logger.in_scope(|| warn!("hostname is empty, reporting unknown"));
            UNKNOWN_HOSTNAME.to_string()
        }
        Err(err) => {
            logger.in_scope(|| warn!(error = %err, "failed to get hostname"));
            UNKNOWN_HOSTNAME.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture::CapturedLogs;

    #[test]
    fn hostname_is_used_when_lookup_succeeds() {
        let name = resolve_hostname(&Logger::disabled(), || Ok(OsString::from("api-01")));
        assert_eq!(name, "api-01");
    }

    #[test]
    fn hostname_failure_falls_back_with_warning() {
        let logs = CapturedLogs::default();

        let name = resolve_hostname(&logs.logger(), || {
            Err(io::Error::new(io::ErrorKind::Other, "no uts namespace"))
        });

        assert_eq!(name, UNKNOWN_HOSTNAME);
        assert_eq!(logs.count("failed to get hostname"), 1);
        assert!(logs.contents().contains("WARN"));
    }

    #[test]
    fn empty_hostname_falls_back() {
        let logs = CapturedLogs::default();

        let name = resolve_hostname(&logs.logger(), || Ok(OsString::new()));

        assert_eq!(name, UNKNOWN_HOSTNAME);
        assert_eq!(logs.count("hostname is empty"), 1);
    }

    #[tokio::test]
    async fn health_check_is_logged_at_info() {
        let logs = CapturedLogs::default();
        let state = AppState::new(logs.logger(), &Config::default());

        let response = health(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let contents = logs.contents();
        let line = contents
            .lines()
            .find(|line| line.contains("health check performed"))
            .expect("health check was not logged");
        assert!(line.contains("INFO"));
    }

    #[test]
    fn app_state_takes_timeout_from_config() {
        let (config, _) = Config::from_vars(vec![("API_TIMEOUT".to_string(), "5s".to_string())]);
        let state = AppState::new(Logger::disabled(), &config);

        assert_eq!(state.request_timeout, Duration::from_secs(5));
        assert!(state.metrics.is_none());
    }
}
