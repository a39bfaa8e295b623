//! Camera price prediction library
//!
//! This crate provides the core functionality for:
//! - Brand classification and category encoding
//! - Request vectorization and gradient boosted price models
//! - Model bundle persistence and the offline training pipeline
//! - Health checks and observability

pub mod brand;
pub mod bundle;
pub mod encoder;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod training;

pub use brand::{classify, extract_training_brand, BrandCategory, UNKNOWN_BRAND};
pub use bundle::ModelBundle;
pub use encoder::CategoryEncoder;
pub use error::{BundleError, DatasetError, EncoderError, ModelError, PredictError, TrainingError};
pub use health::{ComponentStatus, HealthResponse};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{PredictRequest, UnresolvedBrandPolicy};
pub use service::{BrandsResponse, PredictionService};
