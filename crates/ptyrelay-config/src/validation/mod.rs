//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator calls them all and
//! collects errors into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::RelayConfig;
use helpers::{validate_range, validate_range_usize};
use ptyrelay_common::ConfigError;

/// Maximum terminal dimension accepted for the default size.
const MAX_DIMENSION: u32 = 1000;

/// Maximum output queue capacity, in chunks.
const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_cli(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &RelayConfig) {
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    if config.server.port == 0 {
        errors.push("server.port must not be 0".into());
    }
}

fn validate_cli(errors: &mut Vec<String>, config: &RelayConfig) {
    let cli = &config.cli;

    if cli.command.trim().is_empty() {
        errors.push("cli.command must not be empty".into());
    }

    if !is_utf8_label(&cli.encoding) {
        errors.push(format!(
            "cli.encoding = {:?} is not supported (only utf-8)",
            cli.encoding
        ));
    }

    validate_range(
        errors,
        "cli.default_cols",
        u32::from(cli.default_cols),
        1,
        MAX_DIMENSION,
    );
    validate_range(
        errors,
        "cli.default_rows",
        u32::from(cli.default_rows),
        1,
        MAX_DIMENSION,
    );
    validate_range_usize(
        errors,
        "cli.output_queue_capacity",
        cli.output_queue_capacity,
        1,
        MAX_QUEUE_CAPACITY,
    );
}

/// Accepts the common spellings of the UTF-8 encoding label.
fn is_utf8_label(label: &str) -> bool {
    let normalized: String = label
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    normalized == "utf8"
}
