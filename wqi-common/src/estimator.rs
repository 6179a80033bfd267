//! Estimator seam between callers and index producers
//!
//! The serving path uses a trained ensemble; offline analysis can always fall
//! back to [`RuleBasedEstimator`], which evaluates the scoring rules directly.
//! [`predict`] turns a raw estimate into a served [`Prediction`] and never
//! fails: inference errors become score 0 with an explicit error label.

use crate::assessment::{Assessment, PREDICTION_ERROR_LABEL};
use crate::params::ParameterSet;
use crate::rules::RuleTable;
use crate::scoring;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Anything that maps a complete reading to a real-valued index estimate
pub trait Estimator: Send + Sync {
    /// Raw estimate; callers round and clamp
    fn estimate(&self, params: &ParameterSet) -> Result<f64>;

    /// Short identifier for logs and health output
    fn name(&self) -> &str;
}

/// Direct rule evaluation
#[derive(Debug, Clone)]
pub struct RuleBasedEstimator {
    rules: Arc<RuleTable>,
}

impl RuleBasedEstimator {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }
}

impl Estimator for RuleBasedEstimator {
    fn estimate(&self, params: &ParameterSet) -> Result<f64> {
        Ok(f64::from(scoring::score(params, &self.rules)))
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// Optional linear calibration of served estimates: `scale * x + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(default = "default_scale")]
    pub calibration_scale: f64,
    #[serde(default)]
    pub calibration_offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            calibration_scale: default_scale(),
            calibration_offset: 0.0,
        }
    }
}

impl Calibration {
    pub fn is_identity(&self) -> bool {
        self.calibration_scale == 1.0 && self.calibration_offset == 0.0
    }

    fn apply(&self, wqi: u8) -> u8 {
        if self.is_identity() {
            return wqi;
        }
        clamp_index(self.calibration_scale * f64::from(wqi) + self.calibration_offset)
    }
}

/// Served index and label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub wqi: u8,
    pub assessment: String,
}

impl Prediction {
    /// Zero score with the error label
    pub fn failed() -> Self {
        Self {
            wqi: 0,
            assessment: PREDICTION_ERROR_LABEL.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.assessment == PREDICTION_ERROR_LABEL
    }
}

/// Round (halves to even) and clamp a raw estimate into [0, 100]
pub fn clamp_index(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Estimate, round, clamp, calibrate and classify
pub fn predict(estimator: &dyn Estimator, params: &ParameterSet, calibration: &Calibration) -> Prediction {
    match estimator.estimate(params) {
        Ok(raw) if raw.is_finite() => {
            let wqi = calibration.apply(clamp_index(raw));
            Prediction {
                wqi,
                assessment: Assessment::from_index(wqi).label().to_string(),
            }
        }
        Ok(raw) => {
            warn!("Estimator '{}' returned non-finite estimate {}", estimator.name(), raw);
            Prediction::failed()
        }
        Err(e) => {
            warn!("Estimator '{}' failed: {}", estimator.name(), e);
            Prediction::failed()
        }
    }
}
