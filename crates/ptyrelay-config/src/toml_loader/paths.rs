//! Where the config lives and how the first copy gets there.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ptyrelay_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "ptyrelay";
const CONFIG_FILE: &str = "config.toml";

/// `<config dir>/ptyrelay/config.toml`, e.g. `~/.config/ptyrelay/config.toml`
/// on Linux and `~/Library/Application Support/ptyrelay/config.toml` on macOS.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Write the commented template to `path`, creating parent directories.
///
/// Never replaces an existing file: one that is already there (or
/// appears concurrently) is left untouched.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_err =
        |e: std::io::Error| ConfigError::ParseError(format!("cannot write {}: {e}", path.display()));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => return Err(write_err(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_err)
}
