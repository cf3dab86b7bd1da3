//! PTY spawn logic: open a PTY, launch the configured CLI, start the reader thread.

use std::io::{ErrorKind, Read};
use std::sync::{Arc, Mutex};
use std::thread;

use portable_pty::{native_pty_system, CommandBuilder};
use ptyrelay_common::BridgeError;
use ptyrelay_config::CliConfig;
use tokio::sync::mpsc;

use super::types::{pty_size, PtyProcess, PumpEvent, PTY_READ_CHUNK};

// =============================================================================
// COMMAND
// =============================================================================

/// Build the `CommandBuilder` for the configured CLI program.
///
/// The server's environment is inherited (the CLI usually needs its auth
/// tokens), then `cli.env` is layered on top. `TERM` is always set so the
/// program emits xterm-compatible sequences for the browser terminal.
pub(crate) fn build_command(config: &CliConfig) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(&config.command);
    cmd.args(&config.args);

    // portable-pty defaults to $HOME; keep the server's directory instead.
    match &config.working_directory {
        Some(dir) => cmd.cwd(dir),
        None => {
            if let Ok(dir) = std::env::current_dir() {
                cmd.cwd(dir);
            }
        }
    }

    for (key, value) in &config.env {
        cmd.env(key, value);
    }
    cmd.env("TERM", "xterm-256color");

    cmd
}

// =============================================================================
// SPAWN
// =============================================================================

/// Open a PTY of the given size and launch the configured program on it.
///
/// Blocking: callers run this on the blocking pool. Returns the owned
/// process and a reader for the master side.
pub(crate) fn spawn_process(
    config: &CliConfig,
    cols: u16,
    rows: u16,
) -> Result<(PtyProcess, Box<dyn Read + Send>), BridgeError> {
    let spawn_err = |reason: String| BridgeError::Spawn {
        command: config.command.clone(),
        reason,
    };

    let size = pty_size(cols, rows);
    let pair = native_pty_system()
        .openpty(size)
        .map_err(|e| spawn_err(format!("failed to open PTY: {e}")))?;

    let writer = pair
        .master
        .take_writer()
        .map_err(|e| spawn_err(format!("failed to take PTY writer: {e}")))?;

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| spawn_err(format!("failed to clone PTY reader: {e}")))?;

    let child = pair
        .slave
        .spawn_command(build_command(config))
        .map_err(|e| spawn_err(e.to_string()))?;

    // Only the master side stays with us; the child holds the slave.
    drop(pair.slave);

    let process = PtyProcess {
        child,
        master: pair.master,
        writer: Arc::new(Mutex::new(writer)),
        size,
    };
    Ok((process, reader))
}

// =============================================================================
// READER THREAD
// =============================================================================

/// Start the `pty-reader` thread.
///
/// Reads up to [`PTY_READ_CHUNK`] bytes at a time and forwards them over
/// `tx`. `blocking_send` waits while the channel is full, so a slow
/// consumer throttles the child instead of growing memory. The thread
/// exits after reporting EOF or a read error, or once `tx` is closed.
pub(crate) fn spawn_pump(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<PumpEvent>,
) -> Result<(), BridgeError> {
    thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; PTY_READ_CHUNK];
            loop {
                let event = match reader.read(&mut buf) {
                    Ok(0) => PumpEvent::Eof,
                    Ok(n) => PumpEvent::Data(buf[..n].to_vec()),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) if is_hangup(&e) => PumpEvent::Eof,
                    Err(e) => PumpEvent::Failed(e),
                };
                let last = !matches!(event, PumpEvent::Data(_));
                if tx.blocking_send(event).is_err() || last {
                    break;
                }
            }
        })
        .map(|_| ())
        .map_err(BridgeError::Io)
}

/// Linux reports a closed slave side as `EIO` rather than a zero-length read.
#[cfg(unix)]
fn is_hangup(err: &std::io::Error) -> bool {
    const EIO: i32 = 5;
    err.raw_os_error() == Some(EIO)
}

#[cfg(not(unix))]
fn is_hangup(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::BrokenPipe
}

// =============================================================================
// TESTS
// =============================================================================
