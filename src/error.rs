//! Unified error types for the service.

use thiserror::Error;

/// Unified error type for the service.
#[derive(Error, Debug)]
pub enum OrbitError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// A global tracing subscriber was already installed.
    #[error("logging error: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// Errors from parsing a Go-style duration string such as `1h30m`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// The input was empty.
    #[error("empty duration")]
    Empty,

    /// A number was expected but not found.
    #[error("invalid duration {0:?}")]
    Invalid(String),

    /// A number had no unit after it.
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    /// The unit is not one of ns, us, µs, ms, s, m, h.
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit {
        /// The unrecognised unit.
        unit: String,
        /// Full input string.
        input: String,
    },

    /// Negative durations cannot be represented.
    #[error("negative duration {0:?}")]
    Negative(String),

    /// The value does not fit in a duration.
    #[error("duration {0:?} overflows")]
    Overflow(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, OrbitError>;
