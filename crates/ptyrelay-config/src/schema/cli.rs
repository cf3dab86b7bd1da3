//! Settings for the CLI program driven through the pseudo-terminal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default terminal columns when a client omits them.
pub const DEFAULT_COLS: u16 = 120;

/// Default terminal rows when a client omits them.
pub const DEFAULT_ROWS: u16 = 40;

/// Default output queue capacity, in chunks.
pub const DEFAULT_OUTPUT_QUEUE_CAPACITY: usize = 1024;

/// CLI process settings.
///
/// Controls which program is launched per session, its arguments,
/// working directory, extra environment variables, how its output is
/// decoded, and the default terminal size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Program name or path. Looked up on `$PATH` when not absolute.
    pub command: String,
    /// Extra arguments passed to the program.
    pub args: Vec<String>,
    /// Output encoding. Only UTF-8 is supported.
    pub encoding: String,
    pub default_cols: u16,
    pub default_rows: u16,
    /// Initial working directory. `None` means inherit from the server.
    pub working_directory: Option<String>,
    /// Extra environment variables injected into the program.
    pub env: HashMap<String, String>,
    /// Maximum number of output chunks buffered before the reader waits.
    pub output_queue_capacity: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            command: "copilot".into(),
            args: Vec::new(),
            encoding: "utf-8".into(),
            default_cols: DEFAULT_COLS,
            default_rows: DEFAULT_ROWS,
            working_directory: None,
            env: HashMap::new(),
            output_queue_capacity: DEFAULT_OUTPUT_QUEUE_CAPACITY,
        }
    }
}

impl CliConfig {
    /// Config that runs `command` with `args`, other fields defaulted.
    pub fn for_command(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Resolve optional client-supplied dimensions against the defaults.
    pub fn dimensions(&self, cols: Option<u16>, rows: Option<u16>) -> (u16, u16) {
        (
            cols.unwrap_or(self.default_cols),
            rows.unwrap_or(self.default_rows),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
