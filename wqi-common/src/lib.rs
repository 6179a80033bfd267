//! # WQI Common Library
//!
//! Shared code for the water quality index workspace including:
//! - Parameter types (complete and partial eight-field readings)
//! - Rule table and the rule-based scoring function
//! - Assessment classifier
//! - Estimator trait and prediction wrapper
//! - Configuration loading
//! - Utility functions

pub mod assessment;
pub mod config;
pub mod error;
pub mod estimator;
pub mod params;
pub mod rules;
pub mod scoring;
pub mod time;

pub use assessment::Assessment;
pub use error::{Error, Result};
pub use estimator::{Estimator, Prediction, RuleBasedEstimator};
pub use params::{Field, ParameterSet, PartialParameterSet};
pub use rules::{ParamRule, RuleTable};
