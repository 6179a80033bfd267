//! Remote spectral measurement capability (Tier 1 source)
//!
//! **Legible Software Principle:**
//! - Independent module: only depends on the HTTP client
//! - Explicit outcome: every failure is a typed [`RemoteError`]
//! - Transparent behavior: one request per call, with visible timeouts
//!
//! The HTTP source asks a composite service for the median of cloud-filtered
//! scenes over a region and date window and expects mean band reflectances
//! back:
//!
//! ```json
//! { "status": "ok", "scenes": 3, "bands": { "B3": 0.07, "B4": 0.05, "B8": 0.03, "B11": 0.02 } }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Tier 1 failure; every variant cascades to the next tier
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Source disabled or service reachable but reporting no data
    #[error("Remote source unavailable: {0}")]
    Unavailable(String),

    /// No usable scenes in the window
    #[error("No coverage for region in requested window")]
    NoCoverage,

    /// Response did not have the expected shape or values
    #[error("Malformed remote response: {0}")]
    Malformed(String),

    #[error("Remote request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Remote service returned HTTP {0}")]
    Status(u16),

    /// Transport failure
    #[error("Remote request failed: {0}")]
    Request(String),
}

/// Bounding box in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for Region {
    /// Ganga stretch at Varanasi
    fn default() -> Self {
        Self {
            west: 82.9,
            south: 25.2,
            east: 83.1,
            north: 25.4,
        }
    }
}

impl Region {
    fn bbox(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Composite request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRequest {
    pub region: Region,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_cloud_percent: f64,
}

impl CompositeRequest {
    /// Window of `days` ending at `end`
    pub fn ending_at(end: DateTime<Utc>, days: u32, region: Region, max_cloud_percent: f64) -> Self {
        Self {
            region,
            start: end - chrono::Duration::days(i64::from(days)),
            end,
            max_cloud_percent,
        }
    }
}

/// Mean surface reflectance per band over the region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    /// Green
    #[serde(rename = "B3")]
    pub green: f64,
    /// Red
    #[serde(rename = "B4")]
    pub red: f64,
    /// Near infrared
    #[serde(rename = "B8")]
    pub nir: f64,
    /// Short-wave infrared
    #[serde(rename = "B11")]
    pub swir: f64,
}

impl BandStatistics {
    fn values(&self) -> [f64; 4] {
        [self.green, self.red, self.nir, self.swir]
    }

    /// Reject empty and corrupt composites
    pub fn validate(&self) -> Result<(), RemoteError> {
        let values = self.values();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(RemoteError::Malformed(format!("non-finite band value in {:?}", self)));
        }
        if values.iter().all(|&v| v == 0.0) {
            return Err(RemoteError::NoCoverage);
        }
        Ok(())
    }
}

/// Source of Tier 1 band statistics
#[async_trait]
pub trait SpectralSource: Send + Sync {
    /// One attempt; no retries
    async fn fetch(&self, request: &CompositeRequest) -> Result<BandStatistics, RemoteError>;

    /// Identifier for logs
    fn name(&self) -> &str;
}

/// Tier 1 turned off (no endpoint configured)
pub struct DisabledSource;

#[async_trait]
impl SpectralSource for DisabledSource {
    async fn fetch(&self, _request: &CompositeRequest) -> Result<BandStatistics, RemoteError> {
        Err(RemoteError::Unavailable("no remote endpoint configured".to_string()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[derive(Debug, Deserialize)]
struct CompositeResponse {
    status: String,
    #[serde(default)]
    scenes: Option<u32>,
    #[serde(default)]
    bands: Option<BandStatistics>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP composite service client
pub struct HttpSpectralSource {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpSpectralSource {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(endpoint: String, timeout: Duration, connect_timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("wqi-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Request(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint, timeout })
    }
}

#[async_trait]
impl SpectralSource for HttpSpectralSource {
    async fn fetch(&self, request: &CompositeRequest) -> Result<BandStatistics, RemoteError> {
        debug!(
            "Requesting composite: bbox={} window={}..{}",
            request.region.bbox(),
            request.start.date_naive(),
            request.end.date_naive()
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("bbox", request.region.bbox()),
                ("start", wqi_common::time::format_timestamp(&request.start)),
                ("end", wqi_common::time::format_timestamp(&request.end)),
                ("max_cloud", request.max_cloud_percent.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout(self.timeout)
                } else {
                    RemoteError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body: CompositeResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        match body.status.as_str() {
            "ok" => {}
            "no_data" | "empty" => return Err(RemoteError::NoCoverage),
            other => {
                return Err(RemoteError::Unavailable(
                    body.message.unwrap_or_else(|| format!("status '{}'", other)),
                ))
            }
        }
        if body.scenes == Some(0) {
            return Err(RemoteError::NoCoverage);
        }

        let bands = body
            .bands
            .ok_or_else(|| RemoteError::Malformed("missing 'bands'".to_string()))?;
        bands.validate()?;
        Ok(bands)
    }

    fn name(&self) -> &str {
        "http-composite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_validation() {
        let ok = BandStatistics { green: 0.07, red: 0.05, nir: 0.03, swir: 0.02 };
        assert!(ok.validate().is_ok());

        let empty = BandStatistics { green: 0.0, red: 0.0, nir: 0.0, swir: 0.0 };
        assert!(matches!(empty.validate(), Err(RemoteError::NoCoverage)));

        let corrupt = BandStatistics { nir: f64::NAN, ..ok };
        assert!(matches!(corrupt.validate(), Err(RemoteError::Malformed(_))));
    }

    #[test]
    fn test_bands_deserialize_from_band_names() {
        let body: CompositeResponse = serde_json::from_str(
            r#"{"status":"ok","scenes":2,"bands":{"B3":0.1,"B4":0.2,"B8":0.3,"B11":0.4}}"#,
        )
        .unwrap();
        let bands = body.bands.unwrap();
        assert_eq!(bands.red, 0.2);
        assert_eq!(bands.swir, 0.4);
    }

    #[test]
    fn test_request_window() {
        let end = wqi_common::time::parse_timestamp("2024-05-20T12:00:00Z").unwrap();
        let req = CompositeRequest::ending_at(end, 10, Region::default(), 20.0);
        assert_eq!(wqi_common::time::format_timestamp(&req.start), "2024-05-10T12:00:00Z");
        assert_eq!(req.region.bbox(), "82.9,25.2,83.1,25.4");
    }

    #[tokio::test]
    async fn test_disabled_source_is_unavailable() {
        let req = CompositeRequest::ending_at(Utc::now(), 10, Region::default(), 20.0);
        assert!(matches!(DisabledSource.fetch(&req).await, Err(RemoteError::Unavailable(_))));
    }
}
