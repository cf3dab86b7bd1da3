//! Per-connection session handler: routes decoded client messages to a
//! [`ProcessBridge`] and forwards its output back to the browser.
//!
//! A handler holds at most one active session. The session lives in a
//! shared slot so the output forwarder can retire it when the CLI exits on
//! its own; every other transition goes through the handler methods.

use std::sync::Arc;

use futures_util::{pin_mut, Stream, StreamExt};
use ptyrelay_bridge::ProcessBridge;
use ptyrelay_common::SessionId;
use ptyrelay_config::CliConfig;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::protocol::{
    ClientMessage, ProtocolError, ServerMessage, SessionAction, SessionState, STATUS_ALREADY_RUNNING,
    STATUS_CLI_EXITED, STATUS_NO_SESSION, STATUS_SESSION_STARTED, STATUS_SESSION_STOPPED,
    STATUS_START_FAILED,
};

type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

/// A started bridge and the task pumping its output to the client.
struct ActiveSession {
    id: SessionId,
    bridge: ProcessBridge,
    forwarder: Option<Forwarder>,
}

struct Forwarder {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Forwarder {
    /// Signal the task and wait for it to finish.
    async fn shutdown(self, session: &SessionId) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::warn!(session = %session.short(), error = %e, "Output forwarder failed");
            }
        }
    }
}

pub struct SessionHandler {
    cli: CliConfig,
    outbound: mpsc::Sender<ServerMessage>,
    active: SessionSlot,
}

impl SessionHandler {
    /// `outbound` carries frames to the connection writer.
    pub fn new(cli: CliConfig, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            cli,
            outbound,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Decode and dispatch one text frame. Malformed frames are answered
    /// with an error status; nothing here fails the connection.
    pub async fn handle_text(&self, text: &str) {
        match ClientMessage::parse(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => self.reject(e).await,
        }
    }

    /// Answer an undecodable frame with an error status.
    pub async fn reject(&self, error: ProtocolError) {
        tracing::debug!(error = %error, "Rejected client message");
        self.send_status(error.to_string(), SessionState::Error).await;
    }

    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::Input { payload } => self.handle_input(&payload).await,
            ClientMessage::Resize { cols, rows } => self.handle_resize(cols, rows).await,
            ClientMessage::Session(SessionAction::Start { cols, rows }) => {
                self.start_session(cols, rows).await
            }
            ClientMessage::Session(SessionAction::Stop) => self.stop_session().await,
        }
    }

    /// Whether a session is currently active.
    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// PID of the active session's CLI process.
    pub async fn process_id(&self) -> Option<u32> {
        self.active
            .lock()
            .await
            .as_ref()
            .and_then(|session| session.bridge.process_id())
    }

    /// Stop any active session without reporting to the client.
    ///
    /// Called when the connection closes; safe to call repeatedly.
    pub async fn cleanup(&self) {
        let session = self.active.lock().await.take();
        if let Some(session) = session {
            tracing::info!(session = %session.id.short(), "Cleaning up session on disconnect");
            teardown(session).await;
        }
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    async fn start_session(&self, cols: Option<u16>, rows: Option<u16>) {
        let mut active = self.active.lock().await;
        if active.is_some() {
            drop(active);
            self.send_status(STATUS_ALREADY_RUNNING, SessionState::Running)
                .await;
            return;
        }

        let (cols, rows) = self.cli.dimensions(cols, rows);
        let mut bridge = ProcessBridge::new(self.cli.clone());
        if let Err(e) = bridge.start(cols, rows).await {
            drop(active);
            self.send_status(format!("{STATUS_START_FAILED}: {e}"), SessionState::Error)
                .await;
            return;
        }

        let id = SessionId::new();
        tracing::info!(
            session = %id.short(),
            command = %self.cli.command,
            pid = ?bridge.process_id(),
            cols,
            rows,
            "Session started"
        );

        // The status frame goes out before the forwarder exists so it
        // always precedes the first output frame.
        self.send_status(STATUS_SESSION_STARTED, SessionState::Running)
            .await;

        let forwarder = self.spawn_forwarder(id.clone(), &bridge);
        *active = Some(ActiveSession {
            id,
            bridge,
            forwarder: Some(forwarder),
        });
    }

    async fn stop_session(&self) {
        let session = self.active.lock().await.take();
        match session {
            Some(session) => {
                teardown(session).await;
                self.send_status(STATUS_SESSION_STOPPED, SessionState::Stopped)
                    .await;
            }
            None => {
                self.send_status(STATUS_NO_SESSION, SessionState::Stopped)
                    .await
            }
        }
    }

    async fn handle_input(&self, payload: &str) {
        // Take the input handle and release the slot before writing: a
        // write into a full terminal blocks until the process reads or dies,
        // and stop/cleanup need the slot to kill it.
        let target = {
            let active = self.active.lock().await;
            active
                .as_ref()
                .map(|session| (session.id.clone(), session.bridge.input()))
        };

        match target {
            Some((id, Some(input))) => {
                if let Err(e) = input.write(payload).await {
                    tracing::error!(session = %id.short(), error = %e, "Failed to write to CLI");
                }
            }
            Some((id, None)) => {
                tracing::warn!(session = %id.short(), "CLI process is not running, dropping input");
            }
            None => {
                self.send_status(STATUS_NO_SESSION, SessionState::Error)
                    .await
            }
        }
    }

    async fn handle_resize(&self, cols: Option<u16>, rows: Option<u16>) {
        let (cols, rows) = self.cli.dimensions(cols, rows);
        {
            let mut active = self.active.lock().await;
            if let Some(session) = active.as_mut() {
                match session.bridge.resize(cols, rows) {
                    Ok(()) => {
                        tracing::debug!(session = %session.id.short(), cols, rows, "Terminal resized")
                    }
                    Err(e) => {
                        tracing::error!(session = %session.id.short(), error = %e, "Failed to resize terminal")
                    }
                }
                return;
            }
        }
        self.send_status(STATUS_NO_SESSION, SessionState::Error).await;
    }

    fn spawn_forwarder(&self, id: SessionId, bridge: &ProcessBridge) -> Forwarder {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(forward_output(
            id,
            bridge.read_output(),
            self.outbound.clone(),
            Arc::clone(&self.active),
            cancel.clone(),
        ));
        Forwarder { cancel, handle }
    }

    async fn send_status(&self, payload: impl Into<String>, state: SessionState) {
        let message = ServerMessage::status(payload, state);
        if self.outbound.send(message).await.is_err() {
            tracing::debug!("Connection closed, status frame dropped");
        }
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        // Best effort when cleanup() was skipped: dropping the bridge kills
        // the child, cancelling stops the forwarder.
        if let Ok(mut active) = self.active.try_lock() {
            if let Some(mut session) = active.take() {
                if let Some(forwarder) = session.forwarder.take() {
                    forwarder.cancel.cancel();
                }
            }
        }
    }
}

/// Stop the forwarder, then the bridge.
async fn teardown(mut session: ActiveSession) {
    if let Some(forwarder) = session.forwarder.take() {
        forwarder.shutdown(&session.id).await;
    }
    session.bridge.stop().await;
    tracing::info!(session = %session.id.short(), "Session stopped");
}

/// Relay bridge output to the client until cancelled or the stream ends.
///
/// When the stream ends on its own the CLI has exited: the session is
/// removed from the slot, its bridge stopped, and the client told once.
async fn forward_output(
    id: SessionId,
    output: impl Stream<Item = String>,
    outbound: mpsc::Sender<ServerMessage>,
    slot: SessionSlot,
    cancel: CancellationToken,
) {
    pin_mut!(output);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = output.next() => next,
        };
        let Some(chunk) = next else { break };

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = outbound.send(ServerMessage::output(chunk)) => {
                if sent.is_err() {
                    tracing::debug!(session = %id.short(), "Connection closed, output forwarding stopped");
                    return;
                }
            }
        }
    }

    let session = tokio::select! {
        _ = cancel.cancelled() => return,
        mut guard = slot.lock() => {
            let ours = matches!(
                guard.as_ref(),
                Some(session) if session.id == id && !session.bridge.is_running()
            );
            if ours { guard.take() } else { None }
        }
    };
    let Some(mut session) = session else { return };

    // Our own handle: detach rather than join.
    drop(session.forwarder.take());
    session.bridge.stop().await;

    tracing::info!(session = %id.short(), "CLI process exited");
    if outbound
        .send(ServerMessage::status(STATUS_CLI_EXITED, SessionState::Stopped))
        .await
        .is_err()
    {
        tracing::debug!(session = %id.short(), "Connection closed before exit status");
    }
}

// =============================================================================
// TESTS
// =============================================================================
