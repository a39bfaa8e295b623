//! HTTP API: predictions, brand listing, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use price_lib::{
    predictor::request_examples, ComponentStatus, PredictError, PredictionService,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

const PREDICT_PAGE: &str = include_str!("../static/predict.html");

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self { service }
    }
}

/// Error body returned by the JSON endpoints
#[derive(Debug)]
pub enum ApiError {
    /// Body was not valid JSON
    MalformedJson(String),
    Predict(PredictError),
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        ApiError::Predict(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MalformedJson(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid JSON body: {}", message) })),
            )
                .into_response(),
            ApiError::Predict(PredictError::InvalidInput { message, examples }) => {
                let mut body = json!({ "error": message });
                if let (Some(Value::Object(extra)), Value::Object(map)) = (examples, &mut body) {
                    map.extend(extra);
                }
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Predict(PredictError::PredictionFailure(message)) => {
                error!(error = %message, "Prediction failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedJson(e.to_string()))
}

/// Price a Mode 1 (friendly) or Mode 2 (raw) request
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_body(&body)?;
    let response = state.service.predict(&request)?;
    Ok(Json(response))
}

/// Run a prediction on the supplied body, or on a built-in sample when the
/// body is absent or not JSON
async fn test_prediction(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let input = match serde_json::from_slice::<Value>(&body) {
        Ok(value) if !value.is_null() => value,
        _ => request_examples()["mode_1_example"].clone(),
    };
    let result = state.service.predict(&input)?;
    Ok(Json(json!({ "input": input, "result": result })))
}

async fn brands(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.brands())
}

/// Health check response - returns 200 if operational, 503 if unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.service.health();

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn predict_page() -> Html<&'static str> {
    Html(PREDICT_PAGE)
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(predict_page))
        .route("/predict-page", get(predict_page))
        .route("/predict", post(predict))
        .route("/test", post(test_prediction))
        .route("/brands", get(brands))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(build_cors())
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
