//! ptyrelay configuration system.
//!
//! TOML-based configuration with full validation. All sections use
//! sensible defaults so partial configs work out of the box. The loaded
//! [`RelayConfig`] is passed explicitly to the server, the session handler
//! and every process bridge; there is no global config instance.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{CliConfig, LogLevel, LoggingConfig, RelayConfig, ServerConfig};

use std::path::Path;

use ptyrelay_common::ConfigError;

/// Load config from `path` if given, otherwise from the platform default path.
///
/// Unlike [`toml_loader::load_from_path`], this rejects configs that fail
/// validation so the server never starts with out-of-range values.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}
