//! Tracing setup and the injectable [`Logger`] handle.
//!
//! Components never reach for a global logger on their own. They are handed
//! a [`Logger`], which carries the `tracing` dispatcher their events go to.

use std::fmt;

use tracing::{warn, Dispatch};
use tracing_subscriber::{fmt as fmt_layer, prelude::*, EnvFilter};

use crate::config::Config;
use crate::error::Result;

/// Handle to a `tracing` dispatcher, passed to every component that logs.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Wrap an explicit dispatcher.
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Capture whichever dispatcher is the default right now.
    pub fn current() -> Self {
        Self::new(tracing::dispatcher::get_default(Dispatch::clone))
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    /// Run `f` with this logger's dispatcher as the default, so `tracing`
    /// macros inside it are routed here.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// Install the global subscriber and return a [`Logger`] bound to it.
///
/// `RUST_LOG` wins over `LOG_LEVEL` when set. Production environments get
/// JSON lines, everything else the human-readable format.
pub fn init_tracing(config: &Config, verbose: bool) -> Result<Logger> {
    let (filter, rejected) = build_filter(&config.log_level, verbose);
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(fmt_layer::layer().json()).try_init()?;
    } else {
        registry.with(fmt_layer::layer()).try_init()?;
    }

    let logger = Logger::current();
    if let Some(level) = rejected {
        logger.in_scope(|| warn!(log_level = %level, "invalid LOG_LEVEL, using info"));
    }
    Ok(logger)
}

/// Returns the filter plus the log level if it had to be rejected.
fn build_filter(log_level: &str, verbose: bool) -> (EnvFilter, Option<String>) {
    if verbose {
        return (EnvFilter::new("orbit=debug,info"), None);
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }
    match EnvFilter::try_new(log_level) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new("info"), Some(log_level.to_string())),
    }
}

/// In-memory log capture for asserting on what a component logged.
pub mod capture {
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};

    use tracing::Dispatch;

    use super::Logger;

    /// Log sink that keeps every formatted line in memory.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// A [`Logger`] writing plain-text events at every level into this sink.
        pub fn logger(&self) -> Logger {
            let sink = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || sink.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::TRACE)
                .finish();
            Logger::new(Dispatch::new(subscriber))
        }

        /// Everything captured so far.
        pub fn contents(&self) -> String {
            let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&buf).into_owned()
        }

        /// Occurrences of `needle` in the captured output.
        pub fn count(&self, needle: &str) -> usize {
            self.contents().matches(needle).count()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
