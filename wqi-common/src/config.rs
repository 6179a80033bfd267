//! Configuration loading and root folder resolution
//!
//! One TOML file configures the whole workspace. Each binary deserializes the
//! sections it needs into its own struct, flattening [`CommonConfig`] for
//! the shared keys. Missing files are not fatal: a warning is logged and
//! built-in defaults apply.

use crate::rules::{RuleTable, RulesConfig};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "WQI_CONFIG";

/// Environment variable naming the root data folder
pub const ROOT_FOLDER_ENV: &str = "WQI_ROOT_FOLDER";

/// Keys shared by every binary
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommonConfig {
    /// Root folder for model artifacts and the persistence log
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// `[rules.<field>]` overrides merged onto the built-in rule table
    #[serde(default)]
    pub rules: RulesConfig,
}

impl CommonConfig {
    /// Build the immutable, normalized rule table
    pub fn rule_table(&self) -> Result<RuleTable> {
        RuleTable::from_config(&self.rules)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Config file resolution, highest priority first:
/// 1. Command-line argument
/// 2. `WQI_CONFIG` environment variable
/// 3. `<config_dir>/wqi/wqi.toml` if it exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("wqi").join("wqi.toml"))
        .filter(|p| p.exists())
}

/// Load a TOML config section struct
///
/// `None` or a missing file yields `T::default()` (with a warning for the
/// missing-file case). A file that exists but fails to parse is an error.
pub fn load_toml<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file configured, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using built-in defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `WQI_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_root: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_root {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// OS-dependent default root folder (`~/.local/share/wqi` on Linux)
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wqi"))
        .unwrap_or_else(|| PathBuf::from("./wqi_data"))
}

/// Well-known locations under the root folder
#[derive(Debug, Clone)]
pub struct RootLayout {
    root: PathBuf,
}

impl RootLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default trained ensemble artifact
    pub fn model_path(&self) -> PathBuf {
        self.root.join("model").join("model.json")
    }

    /// Default persistence log
    pub fn readings_log_path(&self) -> PathBuf {
        self.root.join("data").join("readings.csv")
    }

    /// Create the root folder and its subdirectories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.root.join("model"))?;
        std::fs::create_dir_all(self.root.join("data"))?;
        Ok(())
    }
}
