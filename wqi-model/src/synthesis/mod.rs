//! Labeled training data
//!
//! Two sources feed the same [`LabeledTable`]:
//! - [`synthetic`]: seeded draws from per-field distributions
//! - [`external`]: a CSV file whose columns are mapped onto canonical fields
//!
//! Labels are always recomputed with the scoring rules; a label column in the
//! source is never trusted.

pub mod external;
pub mod synthetic;

pub use external::load_external_dataset;
pub use synthetic::{Distribution, FieldDistribution, SynthesisConfig, SyntheticGenerator};

use wqi_common::params::{PartialParameterSet, FIELD_COUNT};
use wqi_common::{scoring, RuleTable};

/// One labeled row
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub params: PartialParameterSet,
    /// Rule-based index in [0, 100]
    pub wqi: u8,
    /// Categorical label from an external dataset, kept for comparison only
    pub ground_truth: Option<String>,
}

impl ScoredRecord {
    /// Score a record against the rule table
    pub fn labeled(params: PartialParameterSet, ground_truth: Option<String>, rules: &RuleTable) -> Self {
        Self {
            wqi: scoring::score_partial(&params, rules),
            params,
            ground_truth,
        }
    }
}

/// Ordered collection of labeled rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledTable {
    pub records: Vec<ScoredRecord>,
}

impl LabeledTable {
    pub fn new(records: Vec<ScoredRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute every label with the given rules
    pub fn relabel(&mut self, rules: &RuleTable) {
        for record in &mut self.records {
            record.wqi = scoring::score_partial(&record.params, rules);
        }
    }

    /// Feature rows and labels for rows with all eight fields observed
    ///
    /// Incomplete rows are skipped; their count is returned alongside.
    pub fn complete_rows(&self) -> (Vec<[f64; FIELD_COUNT]>, Vec<f64>, usize) {
        let mut x = Vec::with_capacity(self.records.len());
        let mut y = Vec::with_capacity(self.records.len());
        let mut skipped = 0;

        for record in &self.records {
            match record.params.to_complete() {
                Some(params) => {
                    x.push(params.to_array());
                    y.push(f64::from(record.wqi));
                }
                None => skipped += 1,
            }
        }

        (x, y, skipped)
    }
}
