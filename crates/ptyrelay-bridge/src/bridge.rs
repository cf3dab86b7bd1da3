//! The process bridge: lifecycle, input, resize and output of one CLI process.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use futures_util::Stream;
use ptyrelay_common::BridgeError;
use ptyrelay_config::CliConfig;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::reader::{ReaderLoop, ReaderTask};
use super::spawn::{spawn_process, spawn_pump};
use super::types::{pty_size, PtyProcess, OUTPUT_POLL_TIMEOUT, PUMP_CHANNEL_CAPACITY};

type OutputQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Owns at most one PTY-backed CLI process.
///
/// Invariants:
/// - the reader task exists only while the process is running or until
///   [`stop`](Self::stop) joins it;
/// - once `stop` begins no further chunks reach the output queue, and the
///   queue is empty when it returns.
pub struct ProcessBridge {
    config: CliConfig,
    running: Arc<AtomicBool>,
    output: OutputQueue,
    process: Option<PtyProcess>,
    reader: Option<ReaderTask>,
}

impl ProcessBridge {
    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            output: closed_queue(),
            process: None,
            reader: None,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Spawn the configured CLI on a `cols` x `rows` PTY.
    ///
    /// A no-op when already running. On failure the cause is logged and
    /// returned, and the bridge stays stopped.
    pub async fn start(&mut self, cols: u16, rows: u16) -> Result<(), BridgeError> {
        if self.is_running() {
            tracing::info!("CLI process already running, start is a no-op");
            return Ok(());
        }

        // Reap a process that exited on its own but was never stopped.
        if self.process.is_some() || self.reader.is_some() {
            self.stop().await;
        }

        match self.launch(cols, rows).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(command = %self.config.command, error = %e, "Failed to start CLI process");
                self.running.store(false, Ordering::Release);
                self.process = None;
                Err(e)
            }
        }
    }

    async fn launch(&mut self, cols: u16, rows: u16) -> Result<(), BridgeError> {
        let config = self.config.clone();
        let (mut process, reader) =
            tokio::task::spawn_blocking(move || spawn_process(&config, cols, rows))
                .await
                .map_err(|e| BridgeError::Join(e.to_string()))??;

        let (pump_tx, pump_rx) = mpsc::channel(PUMP_CHANNEL_CAPACITY);
        if let Err(e) = spawn_pump(reader, pump_tx) {
            if let Err(kill_err) = process.child.kill() {
                tracing::debug!("kill after failed reader start: {kill_err}");
            }
            return Err(e);
        }

        let (output_tx, output_rx) = mpsc::channel(self.config.output_queue_capacity.max(1));
        self.output = Arc::new(Mutex::new(output_rx));
        self.running.store(true, Ordering::Release);

        self.reader = Some(
            ReaderLoop {
                pump_rx,
                output_tx,
                running: Arc::clone(&self.running),
                cancel: CancellationToken::new(),
            }
            .spawn(),
        );

        tracing::info!(
            command = %self.config.command,
            pid = ?process.child.process_id(),
            cols,
            rows,
            "CLI process started"
        );
        self.process = Some(process);
        Ok(())
    }

    /// Stop the process and discard any undelivered output. Idempotent.
    ///
    /// Order matters: the reader task is cancelled and joined before the
    /// process is killed and the queue drained, so nothing is enqueued
    /// after the drain.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        if let Some(reader) = self.reader.take() {
            reader.cancel.cancel();
            match reader.handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::warn!(error = %e, "PTY reader task failed"),
            }
        }

        if let Some(process) = self.process.take() {
            terminate(process).await;
        }

        let mut queue = self.output.lock().await;
        let mut discarded = 0usize;
        while queue.try_recv().is_ok() {
            discarded += 1;
        }
        queue.close();
        if discarded > 0 {
            tracing::debug!(discarded, "Discarded undelivered output");
        }
    }

    // =========================================================================
    // INPUT / RESIZE
    // =========================================================================

    /// Write `data` to the process's terminal input.
    ///
    /// A no-op (with a warning) when not running. The write itself runs on
    /// the blocking pool and is awaited.
    pub async fn write(&mut self, data: &str) -> Result<(), BridgeError> {
        match self.input() {
            Some(input) => input.write(data).await,
            None => {
                tracing::warn!("CLI process is not running, dropping input");
                Ok(())
            }
        }
    }

    /// Handle to the terminal input of the running process.
    ///
    /// The handle does not borrow the bridge, so callers holding the bridge
    /// behind a lock can release it before awaiting a write that may block
    /// on a full PTY buffer. Killing the process fails such a write.
    pub fn input(&self) -> Option<PtyInput> {
        self.live_process().map(|process| PtyInput {
            writer: Arc::clone(&process.writer),
        })
    }

    /// Resize the PTY in place. A no-op (with a warning) when not running.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), BridgeError> {
        if !self.is_running() {
            tracing::warn!("CLI process is not running, ignoring resize");
            return Ok(());
        }
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };

        let size = pty_size(cols, rows);
        process
            .master
            .resize(size)
            .map_err(|e| BridgeError::Resize(e.to_string()))?;
        process.size = size;
        tracing::debug!(cols, rows, "PTY resized");
        Ok(())
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Stream of output chunks in production order.
    ///
    /// Each step waits up to [`OUTPUT_POLL_TIMEOUT`] for a chunk and loops on
    /// timeout while the process runs. After EOF the chunks already queued
    /// are still yielded; the stream then ends. It also ends right away
    /// once [`stop`](Self::stop) has run. Dropping the stream mid-wait is safe.
    pub fn read_output(&self) -> impl Stream<Item = String> + Send + 'static {
        let running = Arc::clone(&self.running);
        let output = Arc::clone(&self.output);

        futures_util::stream::unfold((running, output), |(running, output)| async move {
            loop {
                let polled = {
                    let mut queue = output.lock().await;
                    tokio::time::timeout(OUTPUT_POLL_TIMEOUT, queue.recv()).await
                };
                match polled {
                    Ok(Some(chunk)) => return Some((chunk, (running, output))),
                    Ok(None) => return None,
                    Err(_) if running.load(Ordering::Acquire) => continue,
                    Err(_) => return None,
                }
            }
        })
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// True while the process is alive and its output is being read.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.process.is_some()
    }

    /// Current PTY size as `(cols, rows)`, if a process exists.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        self.process.as_ref().map(|p| (p.size.cols, p.size.rows))
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.child.process_id())
    }

    fn live_process(&self) -> Option<&PtyProcess> {
        if self.running.load(Ordering::Acquire) {
            self.process.as_ref()
        } else {
            None
        }
    }
}

impl Drop for ProcessBridge {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(reader) = self.reader.take() {
            reader.cancel.cancel();
            reader.handle.abort();
        }
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.child.kill() {
                tracing::debug!("PTY kill on drop failed (may already be dead): {e}");
            }
            // Reap off-thread so the killed child does not linger as a zombie.
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn_blocking(move || {
                    if let Err(e) = process.child.wait() {
                        tracing::debug!("PTY reap on drop failed: {e}");
                    }
                });
            }
        }
    }
}

/// Writer half of a running process's terminal, detached from the bridge.
#[derive(Clone)]
pub struct PtyInput {
    writer: Arc<StdMutex<Box<dyn Write + Send>>>,
}

impl PtyInput {
    /// Write and flush `data` on the blocking pool.
    pub async fn write(&self, data: &str) -> Result<(), BridgeError> {
        let writer = Arc::clone(&self.writer);
        let bytes = data.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || -> Result<(), BridgeError> {
            let mut writer = writer
                .lock()
                .map_err(|_| BridgeError::Join("PTY writer lock poisoned".into()))?;
            writer.write_all(&bytes)?;
            writer.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| BridgeError::Join(e.to_string()))?
    }
}

/// A receiver whose sender is already gone: yields nothing.
fn closed_queue() -> OutputQueue {
    let (_tx, rx) = mpsc::channel(1);
    Arc::new(Mutex::new(rx))
}

/// Kill the child, then reap it on the blocking pool.
async fn terminate(mut process: PtyProcess) {
    let pid = process.child.process_id();
    if let Err(e) = process.child.kill() {
        tracing::debug!(pid = ?pid, "PTY kill error (may already be dead): {e}");
    }

    let waited = tokio::task::spawn_blocking(move || {
        let status = process.child.wait();
        drop(process);
        status
    })
    .await;

    match waited {
        Ok(Ok(status)) => {
            tracing::info!(pid = ?pid, exit_code = status.exit_code(), "CLI process terminated");
        }
        Ok(Err(e)) => tracing::warn!(pid = ?pid, error = %e, "Failed to reap CLI process"),
        Err(e) => tracing::warn!(pid = ?pid, error = %e, "Reaper task failed"),
    }
}

// =============================================================================
// TESTS
// =============================================================================
