//! Configuration file resolution and loading.
//!
//! Resolution order: `--config` → `ANOMALY_GRID_CONFIG` →
//! `$XDG_CONFIG_HOME/anomaly-grid/detector.toml` → built-in defaults.
//!
//! ```toml
//! [detector]
//! max_order = 4
//! workers = 8
//! score_transform = "excess"
//! default_threshold = 0.5
//!
//! [eval]
//! folds = 5
//! seed = 42
//! ```

use ag_common::{Error, Result};
use ag_core::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG_PATH: &str = "ANOMALY_GRID_CONFIG";

/// Application directory under the XDG config root.
const APP_NAME: &str = "anomaly-grid";

/// Config file name inside the application directory.
const CONFIG_FILENAME: &str = "detector.toml";

/// Where the configuration was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via `--config`.
    CliArgument,
    /// Set via `ANOMALY_GRID_CONFIG`.
    Environment,
    /// Found in the XDG config directory.
    XdgConfig,
    /// No file; built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Defaults for the `eval` subcommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalSettings {
    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_folds() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            seed: default_seed(),
        }
    }
}

/// Contents of `detector.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub eval: EvalSettings,
}

impl CliConfig {
    /// Parse TOML text and validate the detector section.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: CliConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.message().to_string()))?;
        config
            .detector
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Loaded configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CliConfig,
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
}

/// Pick the config file path.
///
/// An explicit path (flag or environment) must exist; the XDG location is
/// used only when present.
pub fn resolve_config_path(
    cli_path: Option<&Path>,
    env_path: Option<String>,
    config_dir: Option<PathBuf>,
) -> Result<(Option<PathBuf>, ConfigSource)> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok((Some(path.to_path_buf()), ConfigSource::CliArgument));
    }

    if let Some(env_path) = env_path.filter(|p| !p.is_empty()) {
        let path = PathBuf::from(env_path);
        if !path.exists() {
            return Err(Error::Config(format!(
                "{} points to missing file {}",
                ENV_CONFIG_PATH,
                path.display()
            )));
        }
        return Ok((Some(path), ConfigSource::Environment));
    }

    if let Some(dir) = config_dir {
        let path = dir.join(APP_NAME).join(CONFIG_FILENAME);
        if path.is_file() {
            return Ok((Some(path), ConfigSource::XdgConfig));
        }
    }

    Ok((None, ConfigSource::BuiltinDefault))
}

/// Resolve and load the configuration from the process environment.
pub fn load_config(cli_path: Option<&Path>) -> Result<LoadedConfig> {
    let (path, source) = resolve_config_path(
        cli_path,
        std::env::var(ENV_CONFIG_PATH).ok(),
        dirs::config_dir(),
    )?;

    let config = match &path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            CliConfig::from_toml(&text).map_err(|e| match e {
                Error::Config(message) => {
                    Error::Config(format!("{}: {}", path.display(), message))
                }
                other => other,
            })?
        }
        None => CliConfig::default(),
    };

    debug!(source = %source, path = ?path, "configuration loaded");
    Ok(LoadedConfig {
        config,
        source,
        path,
    })
}
