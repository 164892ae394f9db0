//! Listener setup and the serve loop.

use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::error::{OrbitError, Result};
use crate::logging::Logger;
use crate::utils::{shutdown_signal, Shutdown};

/// Bind a TCP listener on `addr`.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| OrbitError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve `router` on `listener` until SIGINT, SIGTERM or `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    logger: &Logger,
    shutdown: Shutdown,
) -> Result<()> {
    let logger = logger.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown_signal(&logger) => {}
                () = shutdown.wait() => {
                    logger.in_scope(|| info!("shutdown requested, draining connections"));
                }
            }
        })
        .await
        .map_err(OrbitError::Serve)
}

/// Bind the configured address and serve the API.
///
/// The per-request timeout comes from `API_TIMEOUT`. The socket-level read,
/// write and idle timeouts are carried in [`Config`] but the listener does
/// not apply them.
pub async fn run(config: &Config, state: AppState, shutdown: Shutdown) -> Result<()> {
    let addr = config.listen_addr();
    let listener = bind(&addr).await?;
    let local_addr = listener.local_addr().map_err(OrbitError::Serve)?;

    let logger = state.logger.clone();
    logger.in_scope(|| {
        info!(addr = %local_addr, "server listening");
        debug!(
            request_timeout = ?config.api_timeout,
            read_timeout = ?config.api_read_timeout,
            write_timeout = ?config.api_write_timeout,
            idle_timeout = ?config.api_idle_timeout,
            "timeouts"
        );
    });

    serve(listener, create_router(state), &logger, shutdown).await?;

    logger.in_scope(|| info!("server shut down gracefully"));
    Ok(())
}
