//! Stacked ensemble
//!
//! Level 0: a random forest and a gradient-boosted model. Level 1: a linear
//! meta-learner over `[forest, boosting, features...]`. Meta-learner inputs
//! for training come from out-of-fold base predictions (contiguous K-fold),
//! then both base learners are refit on all rows.

use super::boosting::{BoostingParams, GradientBoosting};
use super::forest::{ForestParams, RandomForest};
use super::linear::LinearRegression;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wqi_common::params::FIELD_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedModel {
    forest: RandomForest,
    boosting: GradientBoosting,
    meta: LinearRegression,
    n_features: usize,
}

/// Contiguous fold boundaries; the first `n % k` folds get one extra row
fn fold_bounds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|f| {
            let len = base + usize::from(f < extra);
            let bounds = (start, start + len);
            start += len;
            bounds
        })
        .collect()
}

fn fit_bases(
    x: &[[f64; FIELD_COUNT]],
    y: &[f64],
    forest: &ForestParams,
    boosting: &BoostingParams,
) -> ModelResult<(RandomForest, GradientBoosting)> {
    let (rf, gb) = rayon::join(
        || RandomForest::fit(x, y, forest),
        || GradientBoosting::fit(x, y, boosting),
    );
    Ok((rf?, gb?))
}

fn meta_row(rf: f64, gb: f64, features: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + features.len());
    row.push(rf);
    row.push(gb);
    row.extend_from_slice(features);
    row
}

impl StackedModel {
    pub fn fit(
        x: &[[f64; FIELD_COUNT]],
        y: &[f64],
        forest: &ForestParams,
        boosting: &BoostingParams,
        cv_folds: usize,
    ) -> ModelResult<Self> {
        let n = x.len();
        if cv_folds < 2 {
            return Err(ModelError::Config(format!("cv_folds must be >= 2, got {}", cv_folds)));
        }
        if n != y.len() || n < cv_folds * 2 {
            return Err(ModelError::InsufficientData(format!(
                "stacking with {} folds needs at least {} rows, got {}",
                cv_folds,
                cv_folds * 2,
                n
            )));
        }

        let mut meta_x: Vec<Vec<f64>> = vec![Vec::new(); n];
        for (fold, (start, end)) in fold_bounds(n, cv_folds).into_iter().enumerate() {
            let train_x: Vec<[f64; FIELD_COUNT]> = x[..start].iter().chain(&x[end..]).copied().collect();
            let train_y: Vec<f64> = y[..start].iter().chain(&y[end..]).copied().collect();
            let (rf, gb) = fit_bases(&train_x, &train_y, forest, boosting)?;
            for i in start..end {
                meta_x[i] = meta_row(rf.predict(&x[i]), gb.predict(&x[i]), &x[i]);
            }
            debug!("Stacking fold {}/{} done ({} held out)", fold + 1, cv_folds, end - start);
        }

        let meta = LinearRegression::fit(&meta_x, y)?;
        let (forest, boosting) = fit_bases(x, y, forest, boosting)?;

        Ok(Self {
            forest,
            boosting,
            meta,
            n_features: FIELD_COUNT,
        })
    }

    pub fn predict(&self, features: &[f64]) -> ModelResult<f64> {
        if features.len() != self.n_features {
            return Err(ModelError::InvalidFeature(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        let row = meta_row(self.forest.predict(features), self.boosting.predict(features), features);
        Ok(self.meta.predict(&row))
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn meta(&self) -> &LinearRegression {
        &self.meta
    }

    pub fn validate(&self) -> ModelResult<()> {
        self.forest.validate(self.n_features)?;
        self.boosting.validate(self.n_features)?;
        self.meta.validate(self.n_features + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_bounds_cover_all_rows() {
        let bounds = fold_bounds(11, 3);
        assert_eq!(bounds, vec![(0, 4), (4, 8), (8, 11)]);
        let bounds = fold_bounds(10, 5);
        assert!(bounds.iter().all(|(s, e)| e - s == 2));
        assert_eq!(bounds.last(), Some(&(8, 10)));
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let x = vec![[0.0; FIELD_COUNT]; 5];
        let y = vec![0.0; 5];
        let result = StackedModel::fit(&x, &y, &ForestParams::default(), &BoostingParams::default(), 5);
        assert!(matches!(result, Err(ModelError::InsufficientData(_))));
    }

    #[test]
    fn test_single_fold_rejected() {
        let x = vec![[0.0; FIELD_COUNT]; 50];
        let y = vec![0.0; 50];
        let result = StackedModel::fit(&x, &y, &ForestParams::default(), &BoostingParams::default(), 1);
        assert!(matches!(result, Err(ModelError::Config(_))));
    }

    #[test]
    fn test_wrong_feature_count_rejected_at_predict() {
        let x: Vec<[f64; FIELD_COUNT]> = (0..40)
            .map(|i| {
                let v = i as f64;
                [v, v * 0.5, (i % 3) as f64, 1.0 + v, (i % 5) as f64, v * 2.0, (i % 7) as f64, 3.0 - v]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|r| r[0] * 2.0 + r[2]).collect();
        let forest = ForestParams { n_trees: 5, max_depth: 4, ..Default::default() };
        let boosting = BoostingParams { n_rounds: 10, max_depth: 3, ..Default::default() };
        let model = StackedModel::fit(&x, &y, &forest, &boosting, 3).unwrap();

        assert!(model.validate().is_ok());
        assert!(matches!(model.predict(&[1.0, 2.0]), Err(ModelError::InvalidFeature(_))));
        assert!(model.predict(&x[0]).unwrap().is_finite());
    }
}
