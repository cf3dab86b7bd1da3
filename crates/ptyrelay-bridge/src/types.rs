//! Bridge types: constants, the owned PTY process, and pump events.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portable_pty::{Child, MasterPty, PtySize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Maximum bytes read from the PTY in a single read (4 KB).
pub const PTY_READ_CHUNK: usize = 4_096;

/// How long the reader loop waits for PTY data before re-checking state.
pub const READ_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// How long an output consumer waits for a chunk before re-checking state.
pub const OUTPUT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between reader loop iterations.
pub const READER_IDLE: Duration = Duration::from_millis(10);

/// Raw chunks buffered between the `pty-reader` thread and the reader loop.
pub(crate) const PUMP_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// PTY PROCESS
// =============================================================================

/// The OS side of a running session: child process plus PTY master.
///
/// The writer sits behind a `std::sync::Mutex` so blocking writes can be
/// moved onto the blocking pool without giving up ownership.
pub(crate) struct PtyProcess {
    pub(crate) child: Box<dyn Child + Send + Sync>,
    pub(crate) master: Box<dyn MasterPty + Send>,
    pub(crate) writer: Arc<Mutex<Box<dyn Write + Send>>>,
    pub(crate) size: PtySize,
}

/// What the `pty-reader` thread observed.
#[derive(Debug)]
pub(crate) enum PumpEvent {
    Data(Vec<u8>),
    Eof,
    Failed(std::io::Error),
}

pub(crate) fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
