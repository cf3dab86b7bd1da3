//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// The equivalent `tracing` level name.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_maps_to_tracing_names() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Info.as_filter(), "info");
        assert_eq!(LogLevel::Warning.as_filter(), "warn");
        assert_eq!(LogLevel::Error.as_filter(), "error");
    }

    #[test]
    fn level_parses_uppercase() {
        let config: LoggingConfig = toml::from_str(r#"level = "WARNING""#).unwrap();
        assert_eq!(config.level, LogLevel::Warning);
    }

    #[test]
    fn level_rejects_lowercase() {
        assert!(toml::from_str::<LoggingConfig>(r#"level = "debug""#).is_err());
    }
}
