//! orbit service entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use orbit::api::AppState;
use orbit::config::{Config, ConfigWarning};
use orbit::logging::init_tracing;
use orbit::utils::Shutdown;
use orbit::{metrics, server};

/// Minimal HTTP service exposing health and status endpoints.
#[derive(Parser, Debug)]
#[command(name = "orbit")]
#[command(about = "HTTP service exposing /health and /api/v1/status")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read overrides from this file instead of `.env`.
    #[arg(long, global = true, env = "ORBIT_ENV_FILE", value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Listen port, overriding PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the resolved configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, warnings) = Config::load_from(args.env_file.as_deref());

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::CheckConfig => cmd_check_config(&config, &warnings),
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port.to_string();
            }
            cmd_serve(config, &warnings, args.verbose).await
        }
    }
}

/// Print the resolved configuration.
fn cmd_check_config(config: &Config, warnings: &[ConfigWarning]) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ORBIT - CONFIGURATION CHECK");
    println!("======================================================================");

    if warnings.is_empty() {
        println!("Warnings: none");
    } else {
        println!("Warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }

    println!("----------------------------------------------------------------------");
    println!("{config:#?}");
    println!("======================================================================");

    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(
    config: Config,
    warnings: &[ConfigWarning],
    verbose: bool,
) -> anyhow::Result<()> {
    let logger = init_tracing(&config, verbose)?;

    logger.in_scope(|| {
        for warning in warnings {
            warn!("{warning}");
        }
        info!(port = %config.port, env = %config.env, "Starting server");
    });

    let mut state = AppState::new(logger.clone(), &config);
    match metrics::install_recorder(&logger) {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => logger.in_scope(|| warn!(error = %e, "metrics disabled")),
    }

    let shutdown = Shutdown::new();
    if let Err(e) = server::run(&config, state, shutdown).await {
        logger.in_scope(|| error!(error = %e, "Failed to start server"));
        return Err(e.into());
    }

    Ok(())
}
