//! Per-connection loop: read client frames, hand them to the session
//! handler, and write outbound frames back.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use ptyrelay_config::CliConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::handler::SessionHandler;
use crate::protocol::{ProtocolError, ServerMessage};

/// Frames buffered between the handler and the socket writer.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Handle a single WebSocket connection until the client leaves or
/// `shutdown` fires. Any session still running is stopped on the way out.
pub async fn handle_connection<S>(
    ws: WebSocketStream<S>,
    addr: SocketAddr,
    cli: CliConfig,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);

    tracing::info!(peer = %addr, "Client connected");

    // Writer: drains the outbound queue independently of the read loop so
    // a handler waiting for queue space never blocks on itself.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode frame");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let handler = SessionHandler::new(cli, tx);

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(peer = %addr, "Server shutting down, closing connection");
                break;
            }
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    tracing::debug!(peer = %addr, "Binary frame is not UTF-8");
                    handler.reject(ProtocolError::InvalidJson).await;
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                tracing::debug!(peer = %addr, error = %e, "WS error");
                break;
            }
            // Pings are answered by tungstenite on the next read.
            _ => continue,
        };

        // Input can wait on the CLI (a full terminal); shutdown still wins,
        // and the cleanup below kills the process to release the write.
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(peer = %addr, "Server shutting down mid-dispatch");
                break;
            }
            _ = handler.handle_text(&text) => {}
        }
    }

    handler.cleanup().await;
    drop(handler);

    if let Err(e) = writer.await {
        tracing::warn!(peer = %addr, error = %e, "Connection writer failed");
    }
    tracing::info!(peer = %addr, "Client disconnected");
}
