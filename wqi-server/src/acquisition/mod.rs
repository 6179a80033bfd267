//! Live data acquisition cascade
//!
//! **Legible Software Principle:** three tiers tried in a fixed order, each
//! returning an explicit [`TierOutcome`]:
//! 1. Live: remote band statistics converted by the configured policy
//! 2. Cached: the last well-formed row of the persistence log
//! 3. Simulated: seasonal/diurnal model; infallible
//!
//! The selected reading is scored once and appended to the log unless it came
//! from the log in the first place.

pub mod conversion;
pub mod remote;
pub mod simulator;

pub use conversion::ConversionPolicy;
pub use remote::{
    BandStatistics, CompositeRequest, DisabledSource, HttpSpectralSource, Region, RemoteError, SpectralSource,
};
pub use simulator::ReadingSimulator;

use crate::config::RemoteConfig;
use crate::log::PersistenceLog;
use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use wqi_common::estimator::{predict, Calibration};
use wqi_common::{Estimator, ParameterSet, Prediction};

/// Which tier supplied a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Cached,
    Simulated,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provenance::Live => "live",
            Provenance::Cached => "cached",
            Provenance::Simulated => "simulated",
        };
        write!(f, "{}", name)
    }
}

/// A reading with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredReading {
    pub params: ParameterSet,
    pub provenance: Provenance,
    /// Acquisition time, or the original log time for cached readings
    pub timestamp: DateTime<Utc>,
}

/// Result of trying one tier
#[derive(Debug)]
pub enum TierOutcome {
    Success(AcquiredReading),
    Unavailable(String),
}

/// Scored reading returned by [`AcquisitionService::acquire`]
#[derive(Debug, Clone, PartialEq)]
pub struct LiveResult {
    pub reading: AcquiredReading,
    pub prediction: Prediction,
}

/// Tier 1 settings resolved from `[remote]`
#[derive(Debug, Clone)]
pub struct LiveTierSettings {
    pub timeout: Duration,
    pub window_days: u32,
    pub max_cloud_percent: f64,
    pub region: Region,
    pub conversion: ConversionPolicy,
}

impl From<&RemoteConfig> for LiveTierSettings {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            window_days: config.window_days,
            max_cloud_percent: config.max_cloud_percent,
            region: config.region,
            conversion: config.conversion,
        }
    }
}

/// Build the Tier 1 source: HTTP when an endpoint is configured, else disabled
pub fn source_from_config(config: &RemoteConfig) -> Result<Arc<dyn SpectralSource>, RemoteError> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpSpectralSource::new(
            endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )?)),
        None => {
            info!("No [remote] endpoint configured; live tier disabled");
            Ok(Arc::new(DisabledSource))
        }
    }
}

pub struct AcquisitionService {
    source: Arc<dyn SpectralSource>,
    settings: LiveTierSettings,
    log: PersistenceLog,
    simulator: ReadingSimulator,
    rng: Mutex<StdRng>,
    estimator: Arc<dyn Estimator>,
    calibration: Calibration,
}

impl AcquisitionService {
    pub fn new(
        source: Arc<dyn SpectralSource>,
        settings: LiveTierSettings,
        log: PersistenceLog,
        estimator: Arc<dyn Estimator>,
        calibration: Calibration,
        simulation_seed: Option<u64>,
    ) -> Self {
        let rng = match simulation_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            source,
            settings,
            log,
            simulator: ReadingSimulator,
            rng: Mutex::new(rng),
            estimator,
            calibration,
        }
    }

    pub fn log(&self) -> &PersistenceLog {
        &self.log
    }

    pub fn estimator(&self) -> &Arc<dyn Estimator> {
        &self.estimator
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    async fn try_live(&self, now: DateTime<Utc>) -> TierOutcome {
        let request = CompositeRequest::ending_at(
            now,
            self.settings.window_days,
            self.settings.region,
            self.settings.max_cloud_percent,
        );

        let fetched = match tokio::time::timeout(self.settings.timeout, self.source.fetch(&request)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.settings.timeout)),
        };

        match fetched
            .and_then(|bands| bands.validate().map(|_| bands))
            .and_then(|bands| self.settings.conversion.convert(&bands))
        {
            Ok(params) => TierOutcome::Success(AcquiredReading {
                params,
                provenance: Provenance::Live,
                timestamp: now,
            }),
            Err(e) => TierOutcome::Unavailable(format!("{} ({})", e, self.source.name())),
        }
    }

    async fn try_cached(&self) -> TierOutcome {
        let log = self.log.clone();
        match tokio::task::spawn_blocking(move || log.last_reading()).await {
            Ok(Ok(Some(last))) => TierOutcome::Success(AcquiredReading {
                params: last.params,
                provenance: Provenance::Cached,
                timestamp: last.timestamp,
            }),
            Ok(Ok(None)) => TierOutcome::Unavailable("no well-formed row in persistence log".to_string()),
            Ok(Err(e)) => {
                warn!("Failed to read persistence log {}: {}", self.log.path().display(), e);
                TierOutcome::Unavailable(format!("log unreadable: {}", e))
            }
            Err(e) => TierOutcome::Unavailable(format!("log reader task failed: {}", e)),
        }
    }

    fn simulate(&self, now: DateTime<Utc>) -> AcquiredReading {
        let local = now.with_timezone(&Local).naive_local();
        let params = match self.rng.lock() {
            Ok(mut rng) => self.simulator.simulate(&local, &mut *rng),
            Err(poisoned) => self.simulator.simulate(&local, &mut *poisoned.into_inner()),
        };
        AcquiredReading {
            params,
            provenance: Provenance::Simulated,
            timestamp: now,
        }
    }

    /// Select a reading through the tiers; never fails
    pub async fn acquire_reading(&self) -> AcquiredReading {
        let now = wqi_common::time::now();

        match self.try_live(now).await {
            TierOutcome::Success(reading) => return reading,
            TierOutcome::Unavailable(reason) => warn!("Live tier unavailable: {}", reason),
        }
        match self.try_cached().await {
            TierOutcome::Success(reading) => return reading,
            TierOutcome::Unavailable(reason) => warn!("Cached tier unavailable: {}", reason),
        }
        self.simulate(now)
    }

    /// Acquire, score and (unless cached) persist one reading
    pub async fn acquire(&self) -> LiveResult {
        let reading = self.acquire_reading().await;
        let prediction = predict(self.estimator.as_ref(), &reading.params, &self.calibration);
        info!(
            "Acquired {} reading: WQI {} ({})",
            reading.provenance, prediction.wqi, prediction.assessment
        );

        if reading.provenance != Provenance::Cached {
            let log = self.log.clone();
            let (timestamp, params, scored) = (reading.timestamp, reading.params, prediction.clone());
            match tokio::task::spawn_blocking(move || log.append(&timestamp, &params, &scored)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to append to persistence log: {}", e),
                Err(e) => warn!("Persistence log writer task failed: {}", e),
            }
        }

        LiveResult { reading, prediction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wqi_common::{RuleBasedEstimator, RuleTable};

    struct Fixed(BandStatistics, AtomicUsize);

    #[async_trait]
    impl SpectralSource for Fixed {
        async fn fetch(&self, _request: &CompositeRequest) -> Result<BandStatistics, RemoteError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0)
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Slow;

    #[async_trait]
    impl SpectralSource for Slow {
        async fn fetch(&self, _request: &CompositeRequest) -> Result<BandStatistics, RemoteError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(RemoteError::Unavailable("never reached".to_string()))
        }
        fn name(&self) -> &str {
            "slow"
        }
    }

    fn service(source: Arc<dyn SpectralSource>, dir: &std::path::Path, timeout: Duration) -> AcquisitionService {
        let settings = LiveTierSettings {
            timeout,
            ..LiveTierSettings::from(&RemoteConfig::default())
        };
        AcquisitionService::new(
            source,
            settings,
            PersistenceLog::new(dir.join("readings.csv")),
            Arc::new(RuleBasedEstimator::new(Arc::new(RuleTable::default()))),
            Calibration::default(),
            Some(1),
        )
    }

    #[tokio::test]
    async fn test_live_tier_makes_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(Fixed(
            BandStatistics { green: 0.08, red: 0.05, nir: 0.04, swir: 0.02 },
            AtomicUsize::new(0),
        ));
        let svc = service(source.clone(), dir.path(), Duration::from_secs(1));
        let result = svc.acquire().await;
        assert_eq!(result.reading.provenance, Provenance::Live);
        assert_eq!(source.1.load(Ordering::SeqCst), 1);
        assert_eq!(result.reading.params.tds, 380.0);
    }

    #[tokio::test]
    async fn test_empty_composite_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(Fixed(
            BandStatistics { green: 0.0, red: 0.0, nir: 0.0, swir: 0.0 },
            AtomicUsize::new(0),
        ));
        let svc = service(source, dir.path(), Duration::from_secs(1));
        assert_eq!(svc.acquire_reading().await.provenance, Provenance::Simulated);
    }

    #[tokio::test]
    async fn test_slow_source_times_out_to_simulation() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(Arc::new(Slow), dir.path(), Duration::from_millis(50));
        let reading = svc.acquire_reading().await;
        assert_eq!(reading.provenance, Provenance::Simulated);
    }

    #[test]
    fn test_provenance_names() {
        assert_eq!(serde_json::to_string(&Provenance::Cached).unwrap(), "\"cached\"");
        assert_eq!(Provenance::Live.to_string(), "live");
    }
}
