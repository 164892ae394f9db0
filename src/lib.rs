//! Minimal HTTP service exposing health and status endpoints.
//!
//! # Request pipeline
//!
//! ```text
//! request -> log_requests -> timeout -> router -> handler -> JsonWriter
//! ```
//!
//! Every component that logs receives a [`logging::Logger`] explicitly.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`logging`]: Tracing setup and the injectable logger
//! - [`metrics`]: Prometheus request metrics
//! - [`api`]: Handlers, middleware, JSON writer and router
//! - [`server`]: Binding and serving
//! - [`utils`]: Shutdown helpers

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod utils;

pub use config::Config;
pub use error::{OrbitError, Result};
pub use logging::Logger;
