//! Tracing subscriber setup.

use ptyrelay_config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Crates whose events are shown at the configured level.
const CRATE_TARGETS: &[&str] = &[
    "ptyrelay",
    "ptyrelay_server",
    "ptyrelay_bridge",
    "ptyrelay_config",
];

/// Filter directive enabling `level` for every ptyrelay crate.
pub fn filter_directive(level: &str) -> String {
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Pick the filter: an explicit override wins, then `RUST_LOG`, then the
/// configured level.
pub fn build_filter(override_level: Option<LogLevel>, configured: LogLevel) -> EnvFilter {
    if let Some(level) = override_level {
        return EnvFilter::new(filter_directive(level.as_filter()));
    }
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(configured.as_filter())))
}

/// Install the global fmt subscriber.
pub fn init(override_level: Option<LogLevel>, configured: LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(override_level, configured))
        .init();
}
