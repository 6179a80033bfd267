//! Offline analysis of a labeled dataset
//!
//! Summarizes rule-based labels per ground-truth category and, when an
//! estimator is supplied, how closely it reproduces the rule labels on every
//! complete row.

use crate::metrics::{mean_absolute_error, r2_score};
use crate::synthesis::LabeledTable;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;
use wqi_common::Estimator;

/// WQI summary for one ground-truth label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single row
    pub std_dev: f64,
    pub min: u8,
    pub max: u8,
}

impl GroupStats {
    fn from_scores(label: String, scores: &[u8]) -> Self {
        let n = scores.len();
        let mean = scores.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let ss: f64 = scores.iter().map(|&s| (f64::from(s) - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        Self {
            label,
            count: n,
            mean,
            std_dev,
            min: scores.iter().copied().min().unwrap_or(0),
            max: scores.iter().copied().max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFit {
    pub estimator: String,
    pub rows: usize,
    pub r2: f64,
    pub mae: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    pub groups: Vec<GroupStats>,
    pub safe_mean: Option<f64>,
    pub unsafe_mean: Option<f64>,
    pub model_fit: Option<ModelFit>,
}

pub fn analyze(table: &LabeledTable, estimator: Option<&dyn Estimator>) -> AnalysisReport {
    let mut by_label: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for record in &table.records {
        if let Some(label) = &record.ground_truth {
            by_label.entry(label.clone()).or_default().push(record.wqi);
        }
    }
    let groups: Vec<GroupStats> = by_label
        .into_iter()
        .map(|(label, scores)| GroupStats::from_scores(label, &scores))
        .collect();
    let mean_of = |name: &str| groups.iter().find(|g| g.label == name).map(|g| g.mean);
    let safe_mean = mean_of("Safe");
    let unsafe_mean = mean_of("Unsafe");

    let model_fit = estimator.map(|est| {
        let mut truth = Vec::new();
        let mut predicted = Vec::new();
        let mut failures = 0usize;
        for record in &table.records {
            let Some(params) = record.params.to_complete() else {
                continue;
            };
            match est.estimate(&params) {
                Ok(v) if v.is_finite() => {
                    truth.push(f64::from(record.wqi));
                    predicted.push(v);
                }
                _ => failures += 1,
            }
        }
        if failures > 0 {
            warn!("Estimator '{}' failed on {} rows during analysis", est.name(), failures);
        }
        ModelFit {
            estimator: est.name().to_string(),
            rows: truth.len(),
            r2: r2_score(&truth, &predicted),
            mae: mean_absolute_error(&truth, &predicted),
        }
    });

    AnalysisReport {
        rows: table.len(),
        groups,
        safe_mean,
        unsafe_mean,
        model_fit,
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows analyzed: {}", self.rows)?;
        if self.groups.is_empty() {
            writeln!(f, "No ground-truth labels in dataset")?;
        } else {
            writeln!(
                f,
                "{:<24} {:>7} {:>8} {:>8} {:>5} {:>5}",
                "label", "count", "mean", "std", "min", "max"
            )?;
            for g in &self.groups {
                writeln!(
                    f,
                    "{:<24} {:>7} {:>8.2} {:>8.2} {:>5} {:>5}",
                    g.label, g.count, g.mean, g.std_dev, g.min, g.max
                )?;
            }
        }
        if let Some(mean) = self.safe_mean {
            writeln!(f, "Mean WQI (Safe): {:.2}", mean)?;
        }
        if let Some(mean) = self.unsafe_mean {
            writeln!(f, "Mean WQI (Unsafe): {:.2}", mean)?;
        }
        if let Some(fit) = &self.model_fit {
            writeln!(
                f,
                "{} vs rule labels on {} rows: R2 = {:.4}, MAE = {:.3}",
                fit.estimator, fit.rows, fit.r2, fit.mae
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::ScoredRecord;
    use std::sync::Arc;
    use wqi_common::params::{Field, PartialParameterSet};
    use wqi_common::{RuleBasedEstimator, RuleTable};

    fn record(turbidity: f64, label: &str, rules: &RuleTable) -> ScoredRecord {
        let params = PartialParameterSet::new()
            .with(Field::Ph, 7.0)
            .with(Field::Turbidity, turbidity)
            .with(Field::Tds, 200.0)
            .with(Field::DissolvedOxygen, 8.0)
            .with(Field::Temperature, 20.0)
            .with(Field::Conductivity, 500.0)
            .with(Field::Chlorine, 0.5)
            .with(Field::Nitrate, 3.0);
        ScoredRecord::labeled(params, Some(label.to_string()), rules)
    }

    #[test]
    fn test_group_statistics() {
        let rules = RuleTable::default();
        let table = LabeledTable::new(vec![
            record(2.0, "Safe", &rules),
            record(50.0, "Safe", &rules),
            record(50.0, "Unsafe", &rules),
        ]);
        let report = analyze(&table, None);

        assert_eq!(report.groups.len(), 2);
        let safe = &report.groups[0];
        assert_eq!(safe.label, "Safe");
        assert_eq!(safe.count, 2);
        assert_eq!(safe.mean, 90.0);
        assert_eq!((safe.min, safe.max), (80, 100));
        assert!((safe.std_dev - 200f64.sqrt()).abs() < 1e-9);
        assert_eq!(report.safe_mean, Some(90.0));
        assert_eq!(report.unsafe_mean, Some(80.0));
        assert!(report.model_fit.is_none());
    }

    #[test]
    fn test_rule_estimator_reproduces_labels() {
        let rules = RuleTable::default();
        let table = LabeledTable::new(vec![
            record(2.0, "Safe", &rules),
            record(30.0, "Safe", &rules),
            record(50.0, "Unsafe", &rules),
        ]);
        let estimator = RuleBasedEstimator::new(Arc::new(rules));
        let report = analyze(&table, Some(&estimator));
        let fit = report.model_fit.as_ref().unwrap();
        assert_eq!(fit.rows, 3);
        assert_eq!(fit.r2, 1.0);
        assert_eq!(fit.mae, 0.0);
        assert!(report.to_string().contains("rules vs rule labels"));
    }

    #[test]
    fn test_unlabeled_table_has_no_groups() {
        let report = analyze(&LabeledTable::default(), None);
        assert!(report.groups.is_empty());
        assert_eq!(report.safe_mean, None);
    }
}
