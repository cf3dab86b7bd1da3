//! Reading `config.toml` into a [`RelayConfig`].

use std::io::ErrorKind;
use std::path::Path;

use ptyrelay_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::RelayConfig;
use crate::validation;

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. A missing file is
/// [`ConfigError::FileNotFound`]. Out-of-range values only produce a
/// warning here; [`crate::load_config`] is the strict entry point.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    let config: RelayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "Config has invalid values");
    }

    info!(path = %path.display(), command = %config.cli.command, "Loaded config");
    Ok(config)
}

/// Load `<config dir>/ptyrelay/config.toml`, writing the commented template
/// there on first run.
pub fn load_default() -> Result<RelayConfig, ConfigError> {
    load_or_create(&default_config_path()?)
}

/// Load `path`; when it does not exist yet, write the template and
/// return the defaults it describes.
pub(super) fn load_or_create(path: &Path) -> Result<RelayConfig, ConfigError> {
    match load_from_path(path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(path)?;
            info!(path = %path.display(), "Wrote default config");
            Ok(RelayConfig::default())
        }
        other => other,
    }
}
