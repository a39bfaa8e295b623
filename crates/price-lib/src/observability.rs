//! Observability infrastructure for the price service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, request outcomes, brand fallbacks, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge_vec, Histogram, IntCounter,
    IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    invalid_requests_total: IntCounter,
    prediction_failures_total: IntCounter,
    brand_fallbacks_total: IntCounter,
    model_info: IntGaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "camprice_prediction_latency_seconds",
                "Time spent vectorizing a request and running the price model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "camprice_predictions_total",
                "Total number of successful price predictions"
            )
            .expect("Failed to register predictions_total"),

            invalid_requests_total: register_int_counter!(
                "camprice_invalid_requests_total",
                "Total number of requests rejected as invalid input"
            )
            .expect("Failed to register invalid_requests_total"),

            prediction_failures_total: register_int_counter!(
                "camprice_prediction_failures_total",
                "Total number of price model failures"
            )
            .expect("Failed to register prediction_failures_total"),

            brand_fallbacks_total: register_int_counter!(
                "camprice_brand_fallbacks_total",
                "Requests whose brand could not be resolved and fell back to code 0"
            )
            .expect("Failed to register brand_fallbacks_total"),

            model_info: register_int_gauge_vec!(
                "camprice_model_info",
                "Shape of the loaded model bundle",
                &["dimension"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_invalid_requests(&self) {
        self.inner().invalid_requests_total.inc();
    }

    pub fn inc_prediction_failures(&self) {
        self.inner().prediction_failures_total.inc();
    }

    pub fn inc_brand_fallbacks(&self) {
        self.inner().brand_fallbacks_total.inc();
    }

    pub fn brand_fallbacks(&self) -> u64 {
        self.inner().brand_fallbacks_total.get()
    }

    /// Record brand, feature and tree counts of the loaded bundle
    pub fn set_model_info(&self, brands: usize, features: usize, trees: usize) {
        let info = &self.inner().model_info;
        info.with_label_values(&["brands"]).set(brands as i64);
        info.with_label_values(&["features"]).set(features as i64);
        info.with_label_values(&["trees"]).set(trees as i64);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, bundle_path: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            bundle = %bundle_path,
            port = port,
            "Price service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Price service shutting down"
        );
    }

    pub fn log_bundle_loaded(
        &self,
        brands: usize,
        trees: usize,
        rmse: f64,
        r2: f64,
        trained_at: &str,
    ) {
        info!(
            event = "bundle_loaded",
            service = %self.service,
            brands = brands,
            trees = trees,
            rmse = rmse,
            r2 = r2,
            trained_at = %trained_at,
            "Model bundle loaded"
        );
    }

    pub fn log_prediction(&self, brand: &str, brand_code: f64, price: f64, elapsed_us: u128) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            brand = %brand,
            brand_code = brand_code,
            price = price,
            elapsed_us = elapsed_us as u64,
            "Generated price prediction"
        );
    }

    /// A friendly request's brand could not be resolved and was defaulted
    pub fn log_brand_fallback(&self, requested: &str, assigned: &str) {
        warn!(
            event = "brand_fallback_applied",
            service = %self.service,
            requested = %requested,
            assigned = %assigned,
            "Brand not recognized, defaulted to code 0"
        );
    }

    pub fn log_prediction_failure(&self, error: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            error = %error,
            "Price model failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        let metrics = ServiceMetrics::new();

        metrics.observe_prediction_latency(0.0002);
        metrics.inc_predictions();
        metrics.inc_invalid_requests();
        metrics.inc_prediction_failures();
        metrics.set_model_info(12, 4, 200);

        let before = metrics.brand_fallbacks();
        metrics.inc_brand_fallbacks();
        assert!(metrics.brand_fallbacks() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("camprice");
        assert_eq!(logger.service, "camprice");
    }
}
