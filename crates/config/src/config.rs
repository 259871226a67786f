//! Configuration files.

use ember_network::RangeServeConfig;
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

const EXTENSION: &str = "toml";

/// Configuration for the ember node.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Configuration for serving historical ranges to peers.
    pub range_serve: RangeServeConfig,
}

impl Config {
    /// Loads the config from `path`.
    ///
    /// A default config is written to `path` if the file does not exist.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Save the configuration to toml file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if path.extension() != Some(OsStr::new(EXTENSION)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("config file extension must be '{EXTENSION}'"),
            ))
        }

        confy::store_path(path, self).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Returns `path` with the config file extension.
    pub fn with_extension(path: impl Into<PathBuf>) -> PathBuf {
        let mut path = path.into();
        path.set_extension(EXTENSION);
        path
    }
}
