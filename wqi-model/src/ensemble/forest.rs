//! Random forest regressor
//!
//! Bagged CART trees averaged together. Each tree draws a bootstrap sample
//! from its own generator seeded with `seed + tree_index`, so trees fit in
//! parallel and the result still depends only on `(data, params)`.

use super::tree::{RegressionTree, TreeParams};
use crate::error::{ModelError, ModelResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Columns considered per split; `None` = all
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 250,
            max_depth: 12,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> ModelResult<()> {
        if self.n_trees == 0 {
            return Err(ModelError::Config("forest n_trees must be > 0".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ModelError::Config("forest max_depth must be > 0".to_string()));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: 2,
            min_samples_leaf: self.min_samples_leaf.max(1),
            max_features: self.max_features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit<R: AsRef<[f64]> + Sync>(x: &[R], y: &[f64], params: &ForestParams) -> ModelResult<Self> {
        params.validate()?;
        if x.is_empty() || x.len() != y.len() {
            return Err(ModelError::InsufficientData(format!(
                "forest needs matching non-empty inputs (x: {}, y: {})",
                x.len(),
                y.len()
            )));
        }

        let n = x.len();
        let n_features = x[0].as_ref().len();
        let allowed: Vec<usize> = (0..n_features).collect();
        let tree_params = params.tree_params();

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, &sample, &allowed, &tree_params, &mut rng)
            })
            .collect::<ModelResult<Vec<_>>>()?;

        debug!("Random forest fitted: {} trees on {} rows", trees.len(), n);
        Ok(Self { trees })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean impurity decrease per feature, normalized to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let n_features = self.trees.first().map(|t| t.n_features()).unwrap_or(0);
        let mut totals = vec![0.0; n_features];
        for tree in &self.trees {
            let imp = tree.importances();
            let tree_total: f64 = imp.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in totals.iter_mut().zip(imp) {
                    *acc += v / tree_total;
                }
            }
        }
        let grand: f64 = totals.iter().sum();
        if grand > 0.0 {
            totals.iter_mut().for_each(|v| *v /= grand);
        }
        totals
    }

    pub fn validate(&self, n_features: usize) -> ModelResult<()> {
        if self.trees.is_empty() {
            return Err(ModelError::Artifact("forest has no trees".to_string()));
        }
        for tree in &self.trees {
            if tree.n_features() != n_features {
                return Err(ModelError::Artifact(format!(
                    "forest tree expects {} features, model has {}",
                    tree.n_features(),
                    n_features
                )));
            }
            tree.validate()?;
        }
        Ok(())
    }
}
