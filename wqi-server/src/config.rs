//! wqi-server configuration
//!
//! Server-side sections of `wqi.toml`: `[server]`, `[remote]`,
//! `[prediction]` and `[simulation]`, plus the shared common keys.

use crate::acquisition::conversion::ConversionPolicy;
use crate::acquisition::remote::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use wqi_common::config::CommonConfig;
use wqi_common::estimator::Calibration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub common: CommonConfig,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub prediction: Calibration,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Overrides `<root>/model/model.json`
    pub model_path: Option<PathBuf>,
    /// Overrides `<root>/data/readings.csv`
    pub log_path: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_path: None,
            log_path: None,
        }
    }
}

/// `[remote]` section; no endpoint disables Tier 1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: Option<String>,
    /// Whole-request bound, also applied around the call by the cascade
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub window_days: u32,
    pub max_cloud_percent: f64,
    pub region: Region,
    pub conversion: ConversionPolicy,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 15,
            connect_timeout_secs: 5,
            window_days: 10,
            max_cloud_percent: 20.0,
            region: Region::default(),
            conversion: ConversionPolicy::default(),
        }
    }
}

/// `[simulation]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed seed for reproducible simulated readings
    #[serde(default)]
    pub seed: Option<u64>,
}
