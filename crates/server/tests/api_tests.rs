//! Integration tests for the price API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use camprice_server::api::{create_router, AppState};
use price_lib::{
    predictor::GradientBoostingRegressor, CategoryEncoder, ModelBundle, Performance,
    PredictionService, StructuredLogger, UnresolvedBrandPolicy,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Brands: Canon=0, Casio=1, Nikon=2, Sony=3
fn test_bundle() -> ModelBundle {
    let x: Vec<[f64; 4]> = (0..40)
        .map(|i| {
            [
                (i % 4) as f64,
                2.0 + (i % 8) as f64,
                120.0 + i as f64 * 6.0,
                80.0 + (i % 5) as f64 * 25.0,
            ]
        })
        .collect();
    let y: Vec<f64> = x
        .iter()
        .map(|r| 90.0 + r[0] * 40.0 + r[1] * 30.0 + r[2] * 0.2)
        .collect();

    let mut model = GradientBoostingRegressor::new().with_n_estimators(25);
    model.fit(&x, &y).unwrap();

    ModelBundle::new(
        model,
        CategoryEncoder::fit(["Canon", "Casio", "Nikon", "Sony"]),
        Performance { rmse: 18.4, r2: 0.87 },
    )
}

fn setup_test_app(policy: UnresolvedBrandPolicy) -> Router {
    let service = PredictionService::new(test_bundle(), policy, StructuredLogger::new("test"));
    create_router(Arc::new(AppState::new(service)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_predict_auto_detects_brand_from_model() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({
                "Brand": "auto",
                "Model": "Nikon Coolpix S3000",
                "Effective pixels": 12.0,
                "Weight": 150,
                "Dimensions": 90
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brand"], "Nikon");
    assert_eq!(body["brand_id"], 2);
    assert_eq!(body["effective_pixels"], 12.0);
    assert_eq!(body["weight"], 150.0);
    assert_eq!(body["dimension_volume"], 90.0);

    let price = body["price"].as_f64().unwrap();
    assert_eq!((price * 100.0).round() / 100.0, price);
}

#[tokio::test]
async fn test_predict_classifies_free_text_brand() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({"Brand": "Canon PowerShot A100", "Effective pixels": 10, "Weight": 200}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brand"], "Canon");
    assert_eq!(body["brand_id"], 0);
    assert_eq!(body["dimension_volume"], 100.0);
}

#[tokio::test]
async fn test_predict_auto_without_model_is_400() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({"Brand": "auto", "Effective pixels": 12, "Weight": 150}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Model"));
}

#[tokio::test]
async fn test_predict_accepts_numeric_brand_code() {
    let app = setup_test_app(UnresolvedBrandPolicy::Reject);
    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({"Brand": 2, "Megapixel": 5.0, "Weight": 300, "Dimensions": 150}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brand"], "Nikon");
    assert_eq!(body["brand_id"], 2);
    assert_eq!(body["effective_pixels"], 5.0);
    assert_eq!(body["dimension_volume"], 150.0);
}

#[tokio::test]
async fn test_predict_raw_mode() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({
                "brand_id": 2,
                "Effective pixels": 5.0,
                "Weight (inc. batteries)": 300,
                "dimension_volume": 150
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brand"], "Nikon");
    assert_eq!(body["brand_id"], 2);

    let direct = test_bundle().model.predict_row(&[2.0, 5.0, 300.0, 150.0]).unwrap();
    assert_eq!(body["price"].as_f64().unwrap(), (direct * 100.0).round() / 100.0);
}

#[tokio::test]
async fn test_predict_raw_mode_out_of_range_code_is_unknown() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({
                "brand_id": 17,
                "Effective pixels": 5.0,
                "Weight (inc. batteries)": 300,
                "dimension_volume": 150
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brand"], "Unknown");
    assert_eq!(body["brand_id"], 17);
}

#[tokio::test]
async fn test_predict_without_mode_returns_examples() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(
        app,
        post_json("/predict", &json!({"Effective pixels": 5.0, "Weight": 300})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(body["mode_1_example"]["Brand"], "Canon");
    assert_eq!(body["mode_2_example"]["brand_id"], 2);
}

#[tokio::test]
async fn test_predict_malformed_json_is_400() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"Brand\": "))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_predict_unknown_brand_follows_policy() {
    let request = json!({"Brand": "Zorki", "Effective pixels": 4, "Weight": 500});

    let (status, body) = send(
        setup_test_app(UnresolvedBrandPolicy::DefaultToFirstCode),
        post_json("/predict", &request),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brand_id"], 0);
    assert_eq!(body["brand"], "Canon");

    let (status, _) = send(
        setup_test_app(UnresolvedBrandPolicy::Reject),
        post_json("/predict", &request),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_is_idempotent() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let request = json!({"Brand": "Sony", "Effective pixels": 7, "Weight": 250, "Dimensions": 120});

    let (_, first) = send(app.clone(), post_json("/predict", &request)).await;
    for _ in 0..3 {
        let (status, again) = send(app.clone(), post_json("/predict", &request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_predict_with_unfitted_model_is_500() {
    let mut bundle = test_bundle();
    bundle.model = GradientBoostingRegressor::new();
    let service = PredictionService::new(
        bundle,
        UnresolvedBrandPolicy::default(),
        StructuredLogger::new("test"),
    );
    let app = create_router(Arc::new(AppState::new(service)));

    let (status, body) = send(
        app,
        post_json(
            "/predict",
            &json!({"Brand": "Sony", "Effective pixels": 7, "Weight": 250}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "model has not been fitted"}));
}

#[tokio::test]
async fn test_brands_lists_encoder_codes() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(app, get("/brands")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["brands"]["Canon"], 0);
    assert_eq!(body["brands"]["Sony"], 3);
    assert_eq!(
        body["features_used"],
        json!(["brand_id", "Effective pixels", "Weight (inc. batteries)", "dimension_volume"])
    );
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["brands_count"], 4);
    assert_eq!(body["performance"]["rmse"], 18.4);
    assert_eq!(body["performance"]["r2"], 0.87);
    assert_eq!(body["features"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_test_endpoint_uses_default_sample() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let request = Request::builder()
        .method("POST")
        .uri("/test")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"]["Brand"], "Canon");
    assert_eq!(body["result"]["brand"], "Canon");
    assert!(body["result"]["price"].is_number());
}

#[tokio::test]
async fn test_test_endpoint_uses_supplied_body() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    let sample = json!({"Brand": "Casio", "Effective pixels": 6, "Weight": 140});
    let (status, body) = send(app, post_json("/test", &sample)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"], sample);
    assert_eq!(body["result"]["brand_id"], 1);
}

#[tokio::test]
async fn test_predict_page_is_served() {
    for uri in ["/", "/predict-page"] {
        let app = setup_test_app(UnresolvedBrandPolicy::default());
        let response = app.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Camera Price Predictor"));
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_test_app(UnresolvedBrandPolicy::default());
    send(
        app.clone(),
        post_json(
            "/predict",
            &json!({"Brand": "Sony", "Effective pixels": 7, "Weight": 250}),
        ),
    )
    .await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("camprice_predictions_total"));
    assert!(text.contains("camprice_model_info"));
}
