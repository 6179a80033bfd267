//! Error types for wqi-model

use thiserror::Error;

/// Training, synthesis and artifact errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Not enough usable rows to fit or evaluate
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Meta-learner normal equations could not be solved
    #[error("Singular system in linear meta-learner")]
    SingularSystem,

    /// Feature vector rejected at inference time
    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    /// Invalid synthesis, ensemble or training parameters
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Model artifact missing, unreadable or inconsistent
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// External dataset could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Artifact (de)serialization failure
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// wqi-common error
    #[error("Common error: {0}")]
    Common(#[from] wqi_common::Error),
}

/// Result type for wqi-model operations
pub type ModelResult<T> = Result<T, ModelError>;

impl From<ModelError> for wqi_common::Error {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Common(inner) => inner,
            other => wqi_common::Error::Model(other.to_string()),
        }
    }
}
