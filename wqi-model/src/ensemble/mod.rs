//! Ensemble regressor
//!
//! **Legible Software Principle:** each learner lives in its own module with a
//! `fit`/`predict`/`validate` surface; [`StackedModel`] only wires them
//! together, and [`TrainedEnsemble`] adds the metadata that travels with a
//! fitted model into the artifact.

pub mod boosting;
pub mod forest;
pub mod linear;
pub mod stacking;
pub mod tree;

pub use boosting::{BoostingParams, GradientBoosting};
pub use forest::{ForestParams, RandomForest};
pub use linear::LinearRegression;
pub use stacking::StackedModel;

use crate::error::{ModelError, ModelResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wqi_common::params::{Field, ParameterSet, FIELD_COUNT};
use wqi_common::Estimator;

/// `[ensemble]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub forest: ForestParams,
    pub boosting: BoostingParams,
    /// Folds used to produce out-of-fold meta-learner inputs
    pub cv_folds: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
            cv_folds: 5,
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> ModelResult<()> {
        self.forest.validate()?;
        self.boosting.validate()?;
        if self.cv_folds < 2 {
            return Err(ModelError::Config(format!("cv_folds must be >= 2, got {}", self.cv_folds)));
        }
        Ok(())
    }

    /// Fit the stacked model on complete rows
    pub fn fit(&self, x: &[[f64; FIELD_COUNT]], y: &[f64]) -> ModelResult<StackedModel> {
        self.validate()?;
        StackedModel::fit(x, y, &self.forest, &self.boosting, self.cv_folds)
    }
}

/// Training provenance stored next to the fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out R²
    pub r2: f64,
    /// Held-out mean absolute error
    pub mae: f64,
    /// Random-forest impurity importances by field name
    pub feature_importances: BTreeMap<String, f64>,
    pub ensemble: EnsembleConfig,
}

/// Fitted model plus metadata; the serving estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedEnsemble {
    pub metadata: ModelMetadata,
    pub model: StackedModel,
}

impl TrainedEnsemble {
    /// Estimate from a raw feature vector in canonical field order
    pub fn estimate_row(&self, row: &[f64; FIELD_COUNT]) -> ModelResult<f64> {
        if let Some(pos) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::InvalidFeature(format!(
                "field '{}' is not finite ({})",
                Field::ALL[pos],
                row[pos]
            )));
        }
        self.model.predict(row)
    }

    /// Field-name keyed importances from a fitted forest
    pub fn importances_by_field(forest: &RandomForest) -> BTreeMap<String, f64> {
        Field::ALL
            .iter()
            .zip(forest.feature_importances())
            .map(|(field, v)| (field.name().to_string(), v))
            .collect()
    }
}

impl Estimator for TrainedEnsemble {
    fn estimate(&self, params: &ParameterSet) -> wqi_common::Result<f64> {
        Ok(self.estimate_row(&params.to_array())?)
    }

    fn name(&self) -> &str {
        "stacked-ensemble"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::{SynthesisConfig, SyntheticGenerator};
    use wqi_common::estimator::{predict, Calibration};
    use wqi_common::RuleTable;

    fn tiny_config() -> EnsembleConfig {
        EnsembleConfig {
            forest: ForestParams { n_trees: 8, max_depth: 6, ..Default::default() },
            boosting: BoostingParams { n_rounds: 30, learning_rate: 0.2, max_depth: 4, ..Default::default() },
            cv_folds: 3,
        }
    }

    fn trained() -> TrainedEnsemble {
        let rules = RuleTable::default();
        let table = SyntheticGenerator::from_config(&SynthesisConfig::default())
            .unwrap()
            .generate(300, &rules)
            .unwrap();
        let (x, y, _) = table.complete_rows();
        let config = tiny_config();
        let model = config.fit(&x, &y).unwrap();
        TrainedEnsemble {
            metadata: ModelMetadata {
                trained_at: Utc::now(),
                train_rows: x.len(),
                test_rows: 0,
                r2: 0.0,
                mae: 0.0,
                feature_importances: TrainedEnsemble::importances_by_field(model.forest()),
                ensemble: config,
            },
            model,
        }
    }

    #[test]
    fn test_non_finite_feature_becomes_prediction_error() {
        let ensemble = trained();
        let mut params = ParameterSet::from_array([7.0, 2.0, 200.0, 8.0, 20.0, 500.0, 0.5, 3.0]);
        params.turbidity = f64::NAN;

        assert!(matches!(
            ensemble.estimate_row(&params.to_array()),
            Err(ModelError::InvalidFeature(_))
        ));
        let prediction = predict(&ensemble, &params, &Calibration::default());
        assert!(prediction.is_error());
        assert_eq!(prediction.wqi, 0);
    }

    #[test]
    fn test_prediction_is_bounded_integer() {
        let ensemble = trained();
        for row in [
            [7.0, 2.0, 200.0, 8.0, 20.0, 500.0, 0.5, 3.0],
            [14.0, 900.0, 1e5, 0.0, 80.0, 1e6, 50.0, 1e4],
            [-3.0, 0.0, 0.0, 40.0, -10.0, 0.0, 0.0, 0.0],
        ] {
            let prediction = predict(&ensemble, &ParameterSet::from_array(row), &Calibration::default());
            assert!(prediction.wqi <= 100);
            assert!(!prediction.is_error());
        }
    }

    #[test]
    fn test_importances_keyed_by_field() {
        let ensemble = trained();
        let imp = &ensemble.metadata.feature_importances;
        assert_eq!(imp.len(), FIELD_COUNT);
        assert!(imp.contains_key("do"));
        assert!((imp.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_ensemble_config_rejected() {
        let config = EnsembleConfig { cv_folds: 1, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
