//! Training pipeline
//!
//! Labeled table → complete rows → seeded 80/20 split → stacked fit →
//! held-out R² and MAE. No rollback: the caller persists whatever this
//! returns.

use crate::ensemble::{EnsembleConfig, ModelMetadata, TrainedEnsemble};
use crate::error::{ModelError, ModelResult};
use crate::metrics::{mean_absolute_error, r2_score};
use crate::synthesis::LabeledTable;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};
use wqi_common::params::FIELD_COUNT;

/// `[training]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of complete rows held out for evaluation
    pub test_fraction: f64,
    /// Shuffle seed for the split
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 1,
        }
    }
}

/// Row indices for the train and test partitions
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle split; the test side gets `ceil(n * test_fraction)` rows
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> ModelResult<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ModelError::Config(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ModelError::InsufficientData(format!(
            "cannot split {} rows with test_fraction {}",
            n, test_fraction
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = order.split_off(n_test);
    Ok(Split { train, test: order })
}

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub ensemble: TrainedEnsemble,
    /// Rows dropped because a field was absent
    pub skipped_rows: usize,
}

pub fn train_and_evaluate(
    table: &LabeledTable,
    ensemble: &EnsembleConfig,
    training: &TrainingConfig,
) -> ModelResult<TrainingReport> {
    let (x, y, skipped_rows) = table.complete_rows();
    if skipped_rows > 0 {
        warn!(
            "Skipping {} of {} rows with missing fields for training",
            skipped_rows,
            table.len()
        );
    }
    if x.is_empty() {
        return Err(ModelError::InsufficientData("no complete rows to train on".to_string()));
    }

    let split = train_test_split(x.len(), training.test_fraction, training.seed)?;
    let pick = |idx: &[usize]| -> (Vec<[f64; FIELD_COUNT]>, Vec<f64>) {
        idx.iter().map(|&i| (x[i], y[i])).unzip()
    };
    let (train_x, train_y) = pick(&split.train);
    let (test_x, test_y) = pick(&split.test);

    info!(
        "Training stacked ensemble on {} rows ({} held out)",
        train_x.len(),
        test_x.len()
    );
    let started = Instant::now();
    let model = ensemble.fit(&train_x, &train_y)?;

    let predictions = test_x
        .iter()
        .map(|row| model.predict(row))
        .collect::<ModelResult<Vec<f64>>>()?;
    let r2 = r2_score(&test_y, &predictions);
    let mae = mean_absolute_error(&test_y, &predictions);
    info!(
        "Training finished in {:.1}s: R2 = {:.4}, MAE = {:.3}",
        started.elapsed().as_secs_f64(),
        r2,
        mae
    );

    let metadata = ModelMetadata {
        trained_at: wqi_common::time::now(),
        train_rows: train_x.len(),
        test_rows: test_x.len(),
        r2,
        mae,
        feature_importances: TrainedEnsemble::importances_by_field(model.forest()),
        ensemble: ensemble.clone(),
    };

    Ok(TrainingReport {
        ensemble: TrainedEnsemble { metadata, model },
        skipped_rows,
    })
}
