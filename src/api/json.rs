//! JSON response writer shared by every handler.
//!
//! The value is encoded into a buffer before any status or header is
//! committed, so an encoding failure always produces a clean `500` rather
//! than a success status followed by an error body.
//!
//! Transport errors while streaming the buffered body to the client happen
//! in the connection task after the handler has returned. They close that
//! connection and nothing else.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::logging::Logger;
use crate::metrics;
use crate::utils::Shutdown;

/// Generic body sent when a response cannot be encoded.
pub const ENCODE_FAILURE_BODY: &str = "Internal Server Error";

/// What to do beyond answering `500` when encoding fails.
#[derive(Debug, Clone, Default)]
pub enum FailurePolicy {
    /// Log and answer `500`; the process keeps serving.
    #[default]
    Respond,
    /// Log, answer `500`, then request graceful shutdown.
    Shutdown(Shutdown),
}

/// Writes serializable values as JSON responses.
#[derive(Debug, Clone)]
pub struct JsonWriter {
    logger: Logger,
    policy: FailurePolicy,
}

impl JsonWriter {
    /// Create a writer with the default [`FailurePolicy::Respond`].
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            policy: FailurePolicy::default(),
        }
    }

    /// Replace the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Encode `value` and build a response with `status` and a JSON
    /// content type.
    pub fn write<T>(&self, value: &T, status: StatusCode) -> Response
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_vec(value) {
            Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(err) => {
                metrics::inc_json_encode_failures();
                self.logger.in_scope(|| {
                    error!(
                        error = %err,
                        intended_status = status.as_u16(),
                        "failed to serialize JSON response"
                    )
                });

                if let FailurePolicy::Shutdown(shutdown) = &self.policy {
                    self.logger
                        .in_scope(|| warn!("requesting shutdown after encode failure"));
                    shutdown.trigger();
                }

                (StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILURE_BODY).into_response()
            }
        }
    }
}

/// One-off form of [`JsonWriter::write`] with the default policy.
pub fn write_json<T>(logger: &Logger, value: &T, status: StatusCode) -> Response
where
    T: Serialize + ?Sized,
{
    JsonWriter::new(logger.clone()).write(value, status)
}
