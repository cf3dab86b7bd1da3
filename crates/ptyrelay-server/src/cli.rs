//! Command-line arguments. Flags override the matching config values.

use std::path::PathBuf;

use clap::Parser;
use ptyrelay_config::{LogLevel, RelayConfig};

#[derive(Parser, Debug)]
#[command(
    name = "ptyrelay",
    version,
    about = "Drive a terminal CLI program from the browser over WebSocket"
)]
pub struct Args {
    /// Config file (defaults to <config dir>/ptyrelay/config.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// CLI program started for each session.
    #[arg(long)]
    pub command: Option<String>,

    /// DEBUG, INFO, WARNING or ERROR. Takes precedence over RUST_LOG.
    #[arg(long, value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,
}

impl Args {
    /// Apply flag overrides on top of the loaded config.
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(command) = &self.command {
            config.cli.command = command.clone();
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    match value.to_ascii_uppercase().as_str() {
        "DEBUG" => Ok(LogLevel::Debug),
        "INFO" => Ok(LogLevel::Info),
        "WARNING" | "WARN" => Ok(LogLevel::Warning),
        "ERROR" => Ok(LogLevel::Error),
        _ => Err(format!(
            "unknown log level '{value}' (expected DEBUG, INFO, WARNING or ERROR)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_leave_config_untouched() {
        let args = Args::try_parse_from(["ptyrelay"]).unwrap();
        let mut config = RelayConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cli.command, "copilot");
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "ptyrelay",
            "--host",
            "127.0.0.1",
            "-p",
            "9001",
            "--command",
            "/bin/bash",
            "--log-level",
            "warning",
        ])
        .unwrap();

        let mut config = RelayConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.cli.command, "/bin/bash");
        assert_eq!(config.logging.level, LogLevel::Warning);
    }

    #[test]
    fn config_path_flag() {
        let args = Args::try_parse_from(["ptyrelay", "--config", "/etc/ptyrelay.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/ptyrelay.toml")));
    }

    #[test]
    fn bad_log_level_is_rejected() {
        assert!(Args::try_parse_from(["ptyrelay", "--log-level", "LOUD"]).is_err());
    }
}
