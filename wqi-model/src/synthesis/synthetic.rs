//! Synthetic training data
//!
//! Each field is drawn independently from its configured distribution and
//! clipped to a physically plausible range. Columns are drawn in canonical
//! field order from one seeded generator, so a given `(rows, seed)` always
//! yields the same table.

use super::{LabeledTable, ScoredRecord};
use crate::error::{ModelError, ModelResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution as _, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use wqi_common::params::{Field, PartialParameterSet, FIELD_COUNT};
use wqi_common::RuleTable;

/// Sampling distribution for one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    /// Exponential with the given mean (`scale = 1 / rate`)
    Exponential { scale: f64 },
}

/// Distribution plus clipping range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDistribution {
    #[serde(flatten)]
    pub distribution: Distribution,
    pub clip_min: f64,
    pub clip_max: f64,
}

impl FieldDistribution {
    const fn normal(mean: f64, std_dev: f64, clip_min: f64, clip_max: f64) -> Self {
        Self {
            distribution: Distribution::Normal { mean, std_dev },
            clip_min,
            clip_max,
        }
    }

    const fn exponential(scale: f64, clip_min: f64, clip_max: f64) -> Self {
        Self {
            distribution: Distribution::Exponential { scale },
            clip_min,
            clip_max,
        }
    }

    /// Built-in distribution for a field
    pub fn default_for(field: Field) -> Self {
        match field {
            Field::Ph => Self::normal(7.2, 0.8, 4.5, 9.5),
            Field::Turbidity => Self::exponential(6.0, 0.0, 200.0),
            Field::Tds => Self::normal(450.0, 300.0, 20.0, 3000.0),
            Field::DissolvedOxygen => Self::normal(6.5, 2.5, 0.5, 14.0),
            Field::Temperature => Self::normal(24.0, 6.0, 4.0, 40.0),
            Field::Conductivity => Self::normal(800.0, 400.0, 50.0, 5000.0),
            Field::Chlorine => Self::normal(0.8, 0.7, 0.0, 5.0),
            Field::Nitrate => Self::exponential(6.0, 0.0, 200.0),
        }
    }
}

/// `[synthesis]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Number of rows to generate
    pub rows: usize,
    pub seed: u64,
    /// `[synthesis.fields.<field>]` replacements for built-in distributions
    pub fields: BTreeMap<String, FieldDistribution>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            rows: 4000,
            seed: 42,
            fields: BTreeMap::new(),
        }
    }
}

impl SynthesisConfig {
    /// Per-field distributions in canonical order, overrides applied
    pub fn distributions(&self) -> ModelResult<[FieldDistribution; FIELD_COUNT]> {
        let mut table = Field::ALL.map(FieldDistribution::default_for);
        for (name, dist) in &self.fields {
            let field = Field::from_name(name)
                .ok_or_else(|| ModelError::Config(format!("unknown synthesis field '{}'", name)))?;
            table[field.index()] = *dist;
        }
        Ok(table)
    }
}

enum Sampler {
    Normal(Normal<f64>),
    Exponential(Exp<f64>),
}

impl Sampler {
    fn build(field: Field, dist: &FieldDistribution) -> ModelResult<Self> {
        if !(dist.clip_min <= dist.clip_max) {
            return Err(ModelError::Config(format!(
                "synthesis field '{}': clip_min {} exceeds clip_max {}",
                field, dist.clip_min, dist.clip_max
            )));
        }
        match dist.distribution {
            Distribution::Normal { mean, std_dev } => Normal::new(mean, std_dev)
                .map(Sampler::Normal)
                .map_err(|e| ModelError::Config(format!("synthesis field '{}': {}", field, e))),
            Distribution::Exponential { scale } if scale > 0.0 => Exp::new(1.0 / scale)
                .map(Sampler::Exponential)
                .map_err(|e| ModelError::Config(format!("synthesis field '{}': {}", field, e))),
            Distribution::Exponential { scale } => Err(ModelError::Config(format!(
                "synthesis field '{}': exponential scale must be > 0, got {}",
                field, scale
            ))),
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            Sampler::Normal(d) => d.sample(rng),
            Sampler::Exponential(d) => d.sample(rng),
        }
    }
}

/// Seeded synthetic table generator
pub struct SyntheticGenerator {
    distributions: [FieldDistribution; FIELD_COUNT],
    seed: u64,
}

impl SyntheticGenerator {
    pub fn from_config(config: &SynthesisConfig) -> ModelResult<Self> {
        Ok(Self {
            distributions: config.distributions()?,
            seed: config.seed,
        })
    }

    /// Generate `rows` labeled records
    pub fn generate(&self, rows: usize, rules: &RuleTable) -> ModelResult<LabeledTable> {
        let samplers = Field::ALL
            .iter()
            .map(|&f| Sampler::build(f, &self.distributions[f.index()]))
            .collect::<ModelResult<Vec<_>>>()?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(FIELD_COUNT);
        for (field, sampler) in Field::ALL.iter().zip(&samplers) {
            let dist = &self.distributions[field.index()];
            let column = (0..rows)
                .map(|_| sampler.sample(&mut rng).clamp(dist.clip_min, dist.clip_max))
                .collect();
            columns.push(column);
        }

        let records = (0..rows)
            .map(|row| {
                let mut params = PartialParameterSet::new();
                for field in Field::ALL {
                    params.set(field, Some(columns[field.index()][row]));
                }
                ScoredRecord::labeled(params, None, rules)
            })
            .collect();

        info!("Generated {} synthetic rows (seed {})", rows, self.seed);
        Ok(LabeledTable::new(records))
    }
}
