//! Accept loop: one WebSocket connection per TCP client, tracked so
//! shutdown can wait for every session to be cleaned up.

use std::sync::Arc;

use ptyrelay_config::RelayConfig;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::connection::handle_connection;

/// Serve connections from `listener` until `shutdown` is cancelled, then
/// wait for open connections to finish their cleanup.
pub async fn serve(listener: TcpListener, config: Arc<RelayConfig>, shutdown: CancellationToken) {
    let tracker = TaskTracker::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let cli = config.cli.clone();
                    let shutdown = shutdown.clone();
                    tracker.spawn(async move {
                        match accept_async(stream).await {
                            Ok(ws) => handle_connection(ws, addr, cli, shutdown).await,
                            Err(e) => {
                                tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }

    tracker.close();
    if !tracker.is_empty() {
        tracing::info!(connections = tracker.len(), "Waiting for connections to close");
    }
    tracker.wait().await;
    tracing::info!("All connections closed");
}

// =============================================================================
// TESTS
// =============================================================================
