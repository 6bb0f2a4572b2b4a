//! Configuration loading for the keyserver gateway.
//!
//! Reads and writes a `config.toml`, by default `~/.keyserver/config.toml`,
//! and expands `~` in configured paths.
//!
//! # Examples
//!
//! ```no_run
//! use keyserver_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("failed to create loader");
//! if !loader.exists() {
//!     loader.write_default(false).expect("failed to write default config");
//! }
//! let config = loader.load().expect("failed to load config");
//! println!("serving on {}", config.server.bind_address());
//! ```

use crate::config::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// The configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// The base directory name within the home directory.
const BASE_DIR_NAME: &str = ".keyserver";

/// Reads and writes one configuration file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader for `~/.keyserver/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
        Ok(Self::with_path(home.join(BASE_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    /// Creates a loader for an explicit file, such as one given with `-c`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyserver_core::config_loader::ConfigLoader;
    /// use std::path::PathBuf;
    ///
    /// let loader = ConfigLoader::with_path(PathBuf::from("/srv/keyserver/config.toml"));
    /// assert_eq!(loader.config_path(), PathBuf::from("/srv/keyserver/config.toml").as_path());
    /// ```
    #[must_use]
    pub const fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Returns the path to the configuration file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration, returning defaults when the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] if the file contains invalid TOML.
    /// Returns [`ConfigError::Io`] if there's an I/O error reading the file.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.exists() {
            return Ok(Config::default());
        }

        self.load_required()
    }

    /// Loads configuration, failing if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the configuration file doesn't exist.
    /// Returns [`ConfigError::ParseFailed`] if the file contains invalid TOML.
    /// Returns [`ConfigError::Io`] if there's an I/O error reading the file.
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        let path = &self.config_path;
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::file_not_found(path.display().to_string())
            } else {
                ConfigError::io(format!("failed to read {}", path.display()), e)
            }
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display()))
        })
    }

    /// Writes the commented default configuration from [`Config::default_toml`],
    /// creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyExists`] if the file exists and `force`
    /// is not set, and [`ConfigError::Io`] if it cannot be written.
    pub fn write_default(&self, force: bool) -> Result<(), ConfigError> {
        let path = &self.config_path;
        if self.exists() && !force {
            return Err(ConfigError::already_exists(path.display().to_string()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::io(format!("failed to create directory {}", parent.display()), e)
            })?;
        }

        fs::write(path, Config::default_toml()).map_err(|e| {
            ConfigError::io(
                format!("failed to write default configuration to {}", path.display()),
                e,
            )
        })
    }

    /// Checks if the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

/// Expands a leading `~` to the home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path starts with `~` and
/// the home directory cannot be determined.
///
/// # Examples
///
/// ```
/// use keyserver_core::config_loader::expand_path;
///
/// let path = expand_path("/etc/keyserver").expect("absolute paths expand");
/// assert_eq!(path.to_string_lossy(), "/etc/keyserver");
/// ```
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
        Ok(home.join(rest))
    } else if path == "~" {
        dirs::home_dir().ok_or_else(ConfigError::no_home_directory)
    } else {
        Ok(PathBuf::from(path))
    }
}
