//! Process bridge: runs a CLI program behind a pseudo-terminal.
//!
//! Uses `portable-pty` to spawn the configured program. A dedicated
//! `pty-reader` thread performs the blocking reads and hands raw bytes to
//! an async reader loop, which decodes them and pushes string chunks onto
//! a bounded FIFO output queue. Consumers drain that queue through
//! [`ProcessBridge::read_output`]. Spawning and writing also run off the
//! async scheduler, on tokio's blocking pool.

mod bridge;
mod decode;
mod reader;
mod spawn;
mod types;

pub use bridge::{ProcessBridge, PtyInput};
pub use types::{OUTPUT_POLL_TIMEOUT, PTY_READ_CHUNK, READER_IDLE, READ_POLL_TIMEOUT};
