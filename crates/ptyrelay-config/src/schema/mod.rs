//! Configuration schema types for ptyrelay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod cli;
mod logging;
mod server;

pub use cli::*;
pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub cli: CliConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_sections() {
        let config = RelayConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cli.command, "copilot");
        assert_eq!(config.cli.encoding, "utf-8");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cli.default_cols, 120);
        assert_eq!(config.cli.default_rows, 40);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
[server]
host = "127.0.0.1"

[logging]
level = "DEBUG"
"#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.cli.command, "copilot");
    }

    #[test]
    fn config_serializes_to_json() {
        let json = serde_json::to_string(&RelayConfig::default()).unwrap();
        assert!(json.contains("\"server\""));
        assert!(json.contains("\"cli\""));
        assert!(json.contains("\"logging\""));
    }
}
