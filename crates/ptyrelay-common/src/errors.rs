use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures surfaced by the PTY process bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("pty io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pty resize failed: {0}")]
    Resize(String),

    #[error("background task failed: {0}")]
    Join(String),
}

/// Startup failures of the relay binary. Session-level failures never
/// surface here; they are reported to the client as status frames.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(String),
}
