//! Per-field scoring rules
//!
//! A [`RuleTable`] is built once at configuration load: raw weights are
//! validated and renormalized to sum to 1.0, and the table is immutable from
//! then on. Callers share it behind an `Arc` and pass it by reference to every
//! scoring call.

use crate::params::{Field, FIELD_COUNT};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scoring rule for one field
///
/// `[min, max]` is the inclusive ideal band; `tol` is the distance past the
/// band at which the subindex reaches 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRule {
    pub min: f64,
    pub max: f64,
    pub tol: f64,
    pub weight: f64,
}

impl ParamRule {
    pub const fn new(min: f64, max: f64, tol: f64, weight: f64) -> Self {
        Self { min, max, tol, weight }
    }

    /// Built-in rule for a field (raw, not yet normalized)
    pub fn default_for(field: Field) -> Self {
        match field {
            Field::Ph => Self::new(6.5, 8.5, 1.0, 0.05),
            Field::Turbidity => Self::new(0.0, 5.0, 10.0, 0.20),
            Field::Tds => Self::new(0.0, 500.0, 700.0, 0.15),
            Field::DissolvedOxygen => Self::new(6.5, 12.0, 4.0, 0.25),
            Field::Temperature => Self::new(10.0, 30.0, 10.0, 0.05),
            Field::Conductivity => Self::new(0.0, 1000.0, 1200.0, 0.10),
            Field::Chlorine => Self::new(0.2, 1.0, 1.0, 0.05),
            Field::Nitrate => Self::new(0.0, 10.0, 20.0, 0.15),
        }
    }

    fn validate(&self, field: Field) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.tol.is_finite() && self.weight.is_finite()) {
            return Err(Error::Config(format!("rule '{}' has non-finite values", field)));
        }
        if self.min > self.max {
            return Err(Error::Config(format!(
                "rule '{}': min {} exceeds max {}",
                field, self.min, self.max
            )));
        }
        if self.tol <= 0.0 {
            return Err(Error::Config(format!("rule '{}': tol must be > 0, got {}", field, self.tol)));
        }
        if self.weight < 0.0 {
            return Err(Error::Config(format!(
                "rule '{}': weight must be >= 0, got {}",
                field, self.weight
            )));
        }
        Ok(())
    }
}

/// Partial rule from TOML; unset keys keep the built-in value
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct RuleOverride {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub tol: Option<f64>,
    pub weight: Option<f64>,
}

/// `[rules.<field>]` tables keyed by canonical field name
pub type RulesConfig = BTreeMap<String, RuleOverride>;

/// Immutable, weight-normalized rule table
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: [ParamRule; FIELD_COUNT],
}

impl RuleTable {
    /// Validate raw rules and renormalize their weights
    ///
    /// # Errors
    /// Returns [`Error::Config`] if any rule has `min > max`, `tol <= 0`, a
    /// negative weight, or if all weights are zero.
    pub fn new(raw: [ParamRule; FIELD_COUNT]) -> Result<Self> {
        for field in Field::ALL {
            raw[field.index()].validate(field)?;
        }

        let total: f64 = raw.iter().map(|r| r.weight).sum();
        if total <= 0.0 {
            return Err(Error::Config("rule weights sum to zero".to_string()));
        }

        let rules = raw.map(|r| ParamRule { weight: r.weight / total, ..r });
        Ok(Self { rules })
    }

    /// Build from built-in rules with TOML overrides merged on top
    pub fn from_config(config: &RulesConfig) -> Result<Self> {
        let mut raw = Field::ALL.map(ParamRule::default_for);

        for (name, over) in config {
            let field = Field::from_name(name)
                .ok_or_else(|| Error::Config(format!("unknown rule field '{}'", name)))?;
            let rule = &mut raw[field.index()];
            if let Some(v) = over.min {
                rule.min = v;
            }
            if let Some(v) = over.max {
                rule.max = v;
            }
            if let Some(v) = over.tol {
                rule.tol = v;
            }
            if let Some(v) = over.weight {
                rule.weight = v;
            }
        }

        Self::new(raw)
    }

    /// Normalized rule for a field
    pub fn rule(&self, field: Field) -> &ParamRule {
        &self.rules[field.index()]
    }

    /// Iterate `(field, rule)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &ParamRule)> {
        Field::ALL.into_iter().zip(self.rules.iter())
    }

    /// Sum of normalized weights (1.0 within floating tolerance)
    pub fn total_weight(&self) -> f64 {
        self.rules.iter().map(|r| r.weight).sum()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let raw = Field::ALL.map(ParamRule::default_for);
        let total: f64 = raw.iter().map(|r| r.weight).sum();
        Self {
            rules: raw.map(|r| ParamRule { weight: r.weight / total, ..r }),
        }
    }
}
