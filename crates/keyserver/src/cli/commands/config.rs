//! # Config Command
//!
//! ```text
//! keyserver config init [--force]   # Write the default configuration
//! keyserver config show             # Print the effective configuration
//! keyserver config path             # Print the configuration file path
//! ```
//!
//! Every command accepts `-c PATH` to use a file other than
//! `~/.keyserver/config.toml`.

use std::path::{Path, PathBuf};

use keyserver_core::config::Config;
use keyserver_core::config_loader::ConfigLoader;
use keyserver_core::error::ConfigError;

use crate::cli::args::ConfigAction;

// ============================================================================
// Config resolution
// ============================================================================

/// A loader for `explicit` if given, else for the default file.
fn loader_for(explicit: Option<&Path>) -> Result<ConfigLoader, ConfigError> {
    match explicit {
        Some(path) => Ok(ConfigLoader::with_path(path.to_path_buf())),
        None => ConfigLoader::new(),
    }
}

/// The configuration file to use: `explicit` if given, else the default.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if no path is given and the home
/// directory cannot be determined.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    Ok(loader_for(explicit)?.config_path().to_path_buf())
}

/// Loads and validates the configuration.
///
/// An explicitly named file must exist. The default file may be missing, in
/// which case the defaults are used.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load_effective_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let loader = loader_for(explicit)?;
    let config = if explicit.is_some() {
        loader.load_required()?
    } else {
        loader.load()?
    };
    config.validate()?;
    Ok(config)
}

// ============================================================================
// ConfigCommandError
// ============================================================================

/// Errors that can occur during config command execution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigCommandError {
    /// Loading, validating or writing failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configuration could not be rendered as TOML.
    #[error("failed to render configuration: {0}")]
    Render(String),
}

// ============================================================================
// ConfigCommand
// ============================================================================

/// The `keyserver config` command handler.
#[derive(Debug, Clone)]
pub struct ConfigCommand {
    /// The action to perform.
    pub action: ConfigAction,
    /// File given with `-c`.
    pub path: Option<PathBuf>,
}

impl ConfigCommand {
    /// Create a new `ConfigCommand`.
    #[must_use]
    pub const fn new(action: ConfigAction, path: Option<PathBuf>) -> Self {
        Self { action, path }
    }

    /// Run the config command.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigCommandError`] if the file cannot be written, read or
    /// validated.
    pub fn run(&self) -> Result<(), ConfigCommandError> {
        match self.action {
            ConfigAction::Init { force } => {
                let path = self.init(force)?;
                println!("Wrote default configuration to {}", path.display());
            }
            ConfigAction::Show => print!("{}", self.render()?),
            ConfigAction::Path => {
                println!("{}", resolve_config_path(self.path.as_deref())?.display());
            }
        }
        Ok(())
    }

    /// Writes the commented default configuration and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyExists`] unless `force` is set when the
    /// file exists.
    pub fn init(&self, force: bool) -> Result<PathBuf, ConfigCommandError> {
        let loader = loader_for(self.path.as_deref())?;
        loader.write_default(force)?;

        let path = loader.config_path().to_path_buf();
        tracing::info!(path = %path.display(), "configuration written");
        Ok(path)
    }

    /// The effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigCommandError`] if loading or rendering fails.
    pub fn render(&self) -> Result<String, ConfigCommandError> {
        let config = load_effective_config(self.path.as_deref())?;
        toml::to_string_pretty(&config).map_err(|e| ConfigCommandError::Render(e.to_string()))
    }
}
