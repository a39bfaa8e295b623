//! Immutable prediction service shared by all request handlers

use crate::bundle::ModelBundle;
use crate::error::PredictError;
use crate::health::HealthResponse;
use crate::models::PredictionResponse;
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{
    format_response, BrandResolution, FeatureVectorizer, PriceModel, UnresolvedBrandPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

/// Body of `GET /brands`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandsResponse {
    pub brands: BTreeMap<String, usize>,
    pub total: usize,
    pub features_used: Vec<String>,
}

/// Bundle plus request policy. Built once at startup, never mutated.
pub struct PredictionService {
    bundle: ModelBundle,
    vectorizer: FeatureVectorizer,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(
        bundle: ModelBundle,
        policy: UnresolvedBrandPolicy,
        logger: StructuredLogger,
    ) -> Self {
        let metrics = ServiceMetrics::new();
        metrics.set_model_info(
            bundle.encoder.len(),
            bundle.feature_names.len(),
            bundle.model.n_trees(),
        );
        logger.log_bundle_loaded(
            bundle.encoder.len(),
            bundle.model.n_trees(),
            bundle.performance.rmse,
            bundle.performance.r2,
            &bundle.trained_at,
        );

        Self {
            bundle,
            vectorizer: FeatureVectorizer::new(policy),
            metrics,
            logger,
        }
    }

    /// Vectorize a request and price it
    pub fn predict(&self, request: &Value) -> Result<PredictionResponse, PredictError> {
        let start = Instant::now();

        let resolved = match self.vectorizer.vectorize(&self.bundle.encoder, request) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.metrics.inc_invalid_requests();
                return Err(e);
            }
        };

        if resolved.resolution == BrandResolution::DefaultedToFirstCode {
            self.metrics.inc_brand_fallbacks();
            let requested = resolved.source_text.as_deref().unwrap_or_default();
            self.logger.log_brand_fallback(requested, &resolved.brand);
        }

        let raw_price = self.bundle.model.predict(&resolved.vector).map_err(|e| {
            self.metrics.inc_prediction_failures();
            self.logger.log_prediction_failure(&e.to_string());
            PredictError::PredictionFailure(e.to_string())
        })?;

        let response = format_response(&resolved, raw_price);
        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        self.metrics.inc_predictions();
        self.logger.log_prediction(
            &response.brand,
            resolved.vector.brand_code,
            response.price,
            elapsed.as_micros(),
        );

        Ok(response)
    }

    pub fn brands(&self) -> BrandsResponse {
        let brands: BTreeMap<String, usize> = self
            .bundle
            .encoder
            .entries()
            .map(|(label, code)| (label.to_string(), code))
            .collect();

        BrandsResponse {
            total: brands.len(),
            brands,
            features_used: self.bundle.feature_names.clone(),
        }
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse::from_bundle(&self.bundle)
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }
}
