//! Error types shared across the prediction pipeline

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the prediction service
#[derive(Debug, Error)]
pub enum PredictError {
    /// Malformed, missing or ambiguous request fields. Always user-correctable.
    #[error("{message}")]
    InvalidInput {
        message: String,
        /// Worked request examples merged into the error payload
        examples: Option<Value>,
    },

    /// The price model failed to produce a value
    #[error("{0}")]
    PredictionFailure(String),
}

impl PredictError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PredictError::InvalidInput {
            message: message.into(),
            examples: None,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, PredictError::InvalidInput { .. })
    }
}

/// Category encoder lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    #[error("unknown brand category: {0:?}")]
    UnknownCategory(String),

    #[error("invalid brand code {code}, expected 0..{size}")]
    InvalidCode { code: i64, size: usize },
}

/// Price model invocation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("model produced a non-finite value: {0}")]
    NonFinite(f64),

    #[error("cannot fit model: {0}")]
    InvalidTrainingData(String),
}

/// Model bundle persistence failures
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to access bundle {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle header missing or unsupported: {0}")]
    BadHeader(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to decode bundle payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("bundle is unusable: {0}")]
    Invalid(String),
}

/// Training dataset loading failures
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset is missing required column {0:?}")]
    MissingColumn(&'static str),

    #[error("dataset has {0} usable rows after cleaning, need at least 2")]
    TooFewRows(usize),
}

/// Failures of the offline training pipeline
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error("failed to fit price model: {0}")]
    Model(#[from] ModelError),
}
