//! Process lifecycle helpers.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use crate::logging::Logger;

/// Waits for a shutdown signal (SIGINT or SIGTERM) and reports it to `logger`.
pub async fn shutdown_signal(logger: &Logger) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            logger.in_scope(|| info!("received SIGINT, starting graceful shutdown"));
        }
        () = terminate => {
            logger.in_scope(|| info!("received SIGTERM, starting graceful shutdown"));
        }
    }
}

/// Programmatic shutdown trigger shared between the server and components
/// that may need to stop it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create an untriggered handle.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            let triggered = *rx.borrow_and_update();
            if triggered {
                return;
            }
            // The sender lives as long as `self`, so this cannot close first.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
