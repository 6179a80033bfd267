//! Gradient-boosted trees (squared error)
//!
//! Starts from the target mean and adds shrunken trees fitted to the current
//! residuals. Every round draws a row subsample and a column subsample from a
//! single seeded generator, so rounds run sequentially.

use super::tree::{RegressionTree, TreeParams};
use crate::error::{ModelError, ModelResult};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows drawn (without replacement) per round
    pub subsample: f64,
    /// Fraction of columns available to each round's tree
    pub colsample_bytree: f64,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 400,
            learning_rate: 0.05,
            max_depth: 8,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> ModelResult<()> {
        let fraction_ok = |f: f64| f > 0.0 && f <= 1.0;
        if self.n_rounds == 0 || self.max_depth == 0 {
            return Err(ModelError::Config("boosting n_rounds and max_depth must be > 0".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::Config(format!(
                "boosting learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if !fraction_ok(self.subsample) || !fraction_ok(self.colsample_bytree) {
            return Err(ModelError::Config(
                "boosting subsample and colsample_bytree must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

fn fraction_of(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(1, total)
}

impl GradientBoosting {
    pub fn fit<R: AsRef<[f64]>>(x: &[R], y: &[f64], params: &BoostingParams) -> ModelResult<Self> {
        params.validate()?;
        if x.is_empty() || x.len() != y.len() {
            return Err(ModelError::InsufficientData(format!(
                "boosting needs matching non-empty inputs (x: {}, y: {})",
                x.len(),
                y.len()
            )));
        }

        let n = x.len();
        let n_features = x[0].as_ref().len();
        let rows_per_round = fraction_of(n, params.subsample);
        let cols_per_tree = fraction_of(n_features, params.colsample_bytree);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: 2,
            min_samples_leaf: params.min_samples_leaf.max(1),
            max_features: None,
        };

        let base_score = y.iter().sum::<f64>() / n as f64;
        let mut current = vec![base_score; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_rounds);
        let mut rng = StdRng::seed_from_u64(params.seed);

        for _ in 0..params.n_rounds {
            for i in 0..n {
                residuals[i] = y[i] - current[i];
            }
            let mut sample = index::sample(&mut rng, n, rows_per_round).into_vec();
            sample.sort_unstable();
            let mut allowed = index::sample(&mut rng, n_features, cols_per_tree).into_vec();
            allowed.sort_unstable();

            let tree = RegressionTree::fit(x, &residuals, &sample, &allowed, &tree_params, &mut rng)?;
            for (pred, row) in current.iter_mut().zip(x) {
                *pred += params.learning_rate * tree.predict(row.as_ref());
            }
            trees.push(tree);
        }

        debug!("Gradient boosting fitted: {} rounds on {} rows", trees.len(), n);
        Ok(Self {
            base_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_score + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    pub fn validate(&self, n_features: usize) -> ModelResult<()> {
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(ModelError::Artifact("boosting header is not finite".to_string()));
        }
        for tree in &self.trees {
            if tree.n_features() != n_features {
                return Err(ModelError::Artifact(format!(
                    "boosting tree expects {} features, model has {}",
                    tree.n_features(),
                    n_features
                )));
            }
            tree.validate()?;
        }
        Ok(())
    }
}
