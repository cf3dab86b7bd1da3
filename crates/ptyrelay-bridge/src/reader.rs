//! Async reader loop: turns raw PTY bytes into ordered output chunks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::decode::Utf8Decoder;
use super::types::{PumpEvent, READER_IDLE, READ_POLL_TIMEOUT};

/// Handle to a running reader loop, owned by the bridge.
pub(crate) struct ReaderTask {
    pub(crate) cancel: CancellationToken,
    pub(crate) handle: JoinHandle<()>,
}

/// State moved into the reader loop task.
pub(crate) struct ReaderLoop {
    pub(crate) pump_rx: mpsc::Receiver<PumpEvent>,
    pub(crate) output_tx: mpsc::Sender<String>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) cancel: CancellationToken,
}

impl ReaderLoop {
    /// Spawn the loop on the current runtime.
    pub(crate) fn spawn(self) -> ReaderTask {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(self.run());
        ReaderTask { cancel, handle }
    }

    /// Poll the PTY until EOF, a read failure, or cancellation.
    ///
    /// Leaves `running` false on every exit path except cancellation,
    /// where the canceller has already cleared it.
    pub(crate) async fn run(mut self) {
        let mut decoder = Utf8Decoder::new();

        while self.running.load(Ordering::Acquire) {
            let polled = tokio::select! {
                _ = self.cancel.cancelled() => break,
                polled = tokio::time::timeout(READ_POLL_TIMEOUT, self.pump_rx.recv()) => polled,
            };

            match polled {
                // Nothing to read within the poll window.
                Err(_) => continue,
                Ok(Some(PumpEvent::Data(bytes))) => {
                    let chunk = decoder.decode(&bytes);
                    if !chunk.is_empty() && !self.push(chunk).await {
                        break;
                    }
                }
                Ok(Some(PumpEvent::Eof)) | Ok(None) => {
                    let tail = decoder.finish();
                    if !tail.is_empty() {
                        self.push(tail).await;
                    }
                    tracing::info!("CLI process closed its terminal (EOF)");
                    self.running.store(false, Ordering::Release);
                    break;
                }
                Ok(Some(PumpEvent::Failed(e))) => {
                    if self.running.load(Ordering::Acquire) && !self.cancel.is_cancelled() {
                        tracing::error!(error = %e, "PTY read failed");
                    }
                    self.running.store(false, Ordering::Release);
                    break;
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(READER_IDLE) => {}
            }
        }

        tracing::debug!("PTY reader loop finished");
    }

    /// Enqueue a chunk, waiting for queue space. Returns false when the
    /// loop should stop (cancelled or the queue was closed).
    async fn push(&self, chunk: String) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.output_tx.send(chunk) => sent.is_ok(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_loop(
        capacity: usize,
    ) -> (
        ReaderLoop,
        mpsc::Sender<PumpEvent>,
        mpsc::Receiver<String>,
        Arc<AtomicBool>,
    ) {
        let (pump_tx, pump_rx) = mpsc::channel(16);
        let (output_tx, output_rx) = mpsc::channel(capacity);
        let running = Arc::new(AtomicBool::new(true));
        let reader = ReaderLoop {
            pump_rx,
            output_tx,
            running: Arc::clone(&running),
            cancel: CancellationToken::new(),
        };
        (reader, pump_tx, output_rx, running)
    }

    #[tokio::test]
    async fn chunks_are_forwarded_in_order() {
        let (reader, pump_tx, mut output_rx, running) = reader_loop(16);
        let task = reader.spawn();

        for i in 0..5 {
            pump_tx
                .send(PumpEvent::Data(format!("chunk{i};").into_bytes()))
                .await
                .unwrap();
        }
        pump_tx.send(PumpEvent::Eof).await.unwrap();
        task.handle.await.unwrap();

        let mut received = Vec::new();
        while let Ok(chunk) = output_rx.try_recv() {
            received.push(chunk);
        }
        assert_eq!(
            received,
            vec!["chunk0;", "chunk1;", "chunk2;", "chunk3;", "chunk4;"]
        );
        assert!(!running.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn eof_clears_running_flag() {
        let (reader, pump_tx, _output_rx, running) = reader_loop(4);
        let task = reader.spawn();

        pump_tx.send(PumpEvent::Eof).await.unwrap();
        task.handle.await.unwrap();
        assert!(!running.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn closed_pump_channel_counts_as_eof() {
        let (reader, pump_tx, _output_rx, running) = reader_loop(4);
        let task = reader.spawn();

        drop(pump_tx);
        task.handle.await.unwrap();
        assert!(!running.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn read_failure_ends_loop() {
        let (reader, pump_tx, _output_rx, running) = reader_loop(4);
        let task = reader.spawn();

        let err = std::io::Error::new(std::io::ErrorKind::Other, "device gone");
        pump_tx.send(PumpEvent::Failed(err)).await.unwrap();
        task.handle.await.unwrap();
        assert!(!running.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn cancellation_stops_a_blocked_producer() {
        // Capacity 1 and nobody draining: the second push blocks.
        let (reader, pump_tx, output_rx, _running) = reader_loop(1);
        let task = reader.spawn();

        pump_tx.send(PumpEvent::Data(b"one".to_vec())).await.unwrap();
        pump_tx.send(PumpEvent::Data(b"two".to_vec())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        task.cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(2), task.handle)
            .await
            .expect("reader should stop promptly after cancel")
            .unwrap();
        drop(output_rx);
    }

    #[tokio::test]
    async fn split_utf8_across_reads_is_reassembled() {
        let (reader, pump_tx, mut output_rx, _running) = reader_loop(8);
        let task = reader.spawn();

        let bytes = "é!".as_bytes();
        pump_tx.send(PumpEvent::Data(bytes[..1].to_vec())).await.unwrap();
        pump_tx.send(PumpEvent::Data(bytes[1..].to_vec())).await.unwrap();
        pump_tx.send(PumpEvent::Eof).await.unwrap();
        task.handle.await.unwrap();

        assert_eq!(output_rx.recv().await.as_deref(), Some("é!"));
    }
}
