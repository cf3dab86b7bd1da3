//! ptyrelay: serve a terminal CLI program to browsers over WebSocket.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ptyrelay_common::{ConfigError, RelayError};
use ptyrelay_config::{validation, RelayConfig};
use ptyrelay_server::{logging, serve};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();

    // The configured level is needed before the subscriber exists.
    let loaded = ptyrelay_config::load_config(args.config.as_deref());
    let configured_level = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();
    logging::init(args.log_level, configured_level);

    match run(args, loaded).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "ptyrelay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    args: cli::Args,
    loaded: Result<RelayConfig, ConfigError>,
) -> ptyrelay_common::Result<()> {
    let mut config = match loaded {
        Ok(config) => config,
        // An explicitly requested file must load.
        Err(e) if args.config.is_some() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            RelayConfig::default()
        }
    };
    args.apply(&mut config);
    validation::validate(&config)?;

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Network(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(command = %config.cli.command, "ptyrelay listening on {}", addr);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    serve(listener, Arc::new(config), shutdown).await;
    tracing::info!("ptyrelay stopped");
    Ok(())
}
