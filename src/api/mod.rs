//! HTTP API module for health, status, metrics and docs endpoints.

pub mod docs;
pub mod handlers;
pub mod json;
pub mod middleware;
pub mod routes;

pub use handlers::AppState;
pub use json::{write_json, FailurePolicy, JsonWriter};
pub use middleware::RequestDeadline;
pub use routes::create_router;
