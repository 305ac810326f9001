//! Reading [`ServerConfig`] from a TOML file on disk.
//!
//! The file is optional and read-only: the server never writes it.  Parsing
//! and validation live in the domain layer
//! ([`ServerConfig::from_toml_str`]); this module only does the file I/O.

use std::path::Path;

use crate::domain::{ConfigError, ServerConfig};

/// Loads a config file.
///
/// Unlike an implicit default location, a path the user named explicitly
/// must exist, so "not found" is an error too.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`] or
/// [`ConfigError::Invalid`] if its content is rejected.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ServerConfig::from_toml_str(&content)
}
