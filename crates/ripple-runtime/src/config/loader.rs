//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A config file: the one given to [`ConfigLoader::file`], or else the
//!    first `ripple.toml` found on the search paths
//! 3. `RIPPLE_*` environment variables (`__` separates nesting levels)
//! 4. Programmatic overrides from [`ConfigLoader::merge`]
//!
//! ```bash
//! RIPPLE_BOT__ACCESS_TOKEN=...   # bot.access_token
//! RIPPLE_LONGPOLL__WAIT=10       # longpoll.wait
//! RIPPLE_LOGGING__LEVEL=debug    # logging.level
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::Format;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::RippleConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "RIPPLE_";
const CONFIG_STEM: &str = "ripple";

/// Builder for layered configuration.
#[derive(Debug)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    overrides: Vec<Figment>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader searching the working directory and the user config
    /// directory (`~/.config/ripple` on Linux).
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(".")];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join(CONFIG_STEM));
        }
        Self {
            file: None,
            search_paths,
            load_env: true,
            overrides: Vec::new(),
        }
    }

    /// Uses this file instead of searching. It must exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a directory to search for `ripple.toml`.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `RIPPLE_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers serializable overrides on top of every other source.
    pub fn merge<T: Serialize>(mut self, overrides: T) -> Self {
        self.overrides
            .push(Figment::from(Serialized::defaults(overrides)));
        self
    }

    /// Loads, merges and validates the configuration.
    pub fn load(self) -> ConfigResult<RippleConfig> {
        let config = self.load_unvalidated()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Loads and merges without validation.
    pub fn load_unvalidated(self) -> ConfigResult<RippleConfig> {
        let mut figment = Figment::from(Serialized::defaults(RippleConfig::default()));

        match &self.file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                figment = merge_file(figment, path)?;
            }
            None => {
                if let Some(path) = self.find_config_file() {
                    figment = merge_file(figment, &path)?;
                }
            }
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        for overrides in self.overrides {
            figment = figment.merge(overrides);
        }

        Ok(figment.extract()?)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .flat_map(|dir| {
                supported_extensions()
                    .iter()
                    .map(move |ext| dir.join(format!("{CONFIG_STEM}.{ext}")))
            })
            .find(|path| path.is_file())
    }
}

fn supported_extensions() -> &'static [&'static str] {
    #[cfg(feature = "toml-config")]
    {
        &["toml"]
    }
    #[cfg(not(feature = "toml-config"))]
    {
        &[]
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    debug!(path = %path.display(), "Loading configuration file");
    match ext.as_str() {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(figment::providers::Toml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(ext)),
    }
}

/// Loads configuration from the default sources.
pub fn load_config() -> ConfigResult<RippleConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file, plus the environment.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<RippleConfig> {
    ConfigLoader::new().file(path).load()
}
