//! wqi-model library interface
//!
//! Training data synthesis, the stacked ensemble and its artifact, and
//! offline analysis. The `wqi-model` binary drives these; `wqi-server` only
//! needs [`artifact::load`] and [`TrainedEnsemble`].

pub mod analysis;
pub mod artifact;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod synthesis;
pub mod training;

pub use crate::ensemble::TrainedEnsemble;
pub use crate::error::{ModelError, ModelResult};
