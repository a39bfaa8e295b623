//! Service health reporting

use crate::bundle::ModelBundle;
use crate::models::Performance;
use serde::{Deserialize, Serialize};

/// Health status of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Model loaded and evaluated better than a constant baseline
    Healthy,
    /// Serving, but the held-out R² is negative
    Degraded,
    /// Model cannot produce predictions
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the service can still answer requests
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub model_loaded: bool,
    pub features: Vec<String>,
    pub performance: Performance,
    pub brands_count: usize,
    pub trained_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthResponse {
    pub fn from_bundle(bundle: &ModelBundle) -> Self {
        let model_loaded = bundle.model.is_fitted() && !bundle.encoder.is_empty();
        let (status, message) = if !model_loaded {
            (
                ComponentStatus::Unhealthy,
                Some("price model or brand encoder is empty".to_string()),
            )
        } else if bundle.performance.r2 < 0.0 {
            (
                ComponentStatus::Degraded,
                Some(format!(
                    "held-out R² {:.4} is worse than predicting the mean",
                    bundle.performance.r2
                )),
            )
        } else {
            (ComponentStatus::Healthy, None)
        };

        Self {
            status,
            model_loaded,
            features: bundle.feature_names.clone(),
            performance: bundle.performance,
            brands_count: bundle.encoder.len(),
            trained_at: bundle.trained_at.clone(),
            message,
        }
    }
}
