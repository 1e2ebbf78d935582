//! Integration test: prediction API endpoints

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use ndarray::{Array1, Array2};
use serde_json::{json, Value};
use std::sync::Arc;
use telco_churn::inference::PredictService;
use telco_churn::preprocessing::PreprocessingArtifact;
use telco_churn::server::{create_router, AppState};
use telco_churn::training::ChurnClassifier;
use tower::ServiceExt;

/// Returns the first feature as the churn probability
struct EchoModel;

impl ChurnClassifier for EchoModel {
    fn predict_proba(&self, x: &Array2<f64>) -> telco_churn::Result<Array1<f64>> {
        Ok(x.column(0).to_owned())
    }
}

fn test_app() -> axum::Router {
    let artifact = PreprocessingArtifact::new(vec!["p".to_string(), "tenure".to_string()]);
    let service = PredictService::new(&artifact, Arc::new(EchoModel), 0.35).unwrap();
    create_router(Arc::new(AppState::new(Arc::new(service))))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = test_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_root_lists_routes() {
    let response = test_app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["usage"]["single"], "/predict/single");
    assert_eq!(body["usage"]["batch"], "/predict/batch");
}

#[tokio::test]
async fn test_predict_single_at_threshold() {
    let request = post_json("/predict/single", json!({"data": {"p": 0.35, "extra": "x"}}).to_string());
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"probability_churn": 0.35, "prediction": 1})
    );
}

#[tokio::test]
async fn test_predict_single_missing_features_zero_filled() {
    let request = post_json("/predict/single", json!({"data": {"tenure": 12}}).to_string());
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"probability_churn": 0.0, "prediction": 0})
    );
}

#[tokio::test]
async fn test_predict_batch_keeps_order() {
    let body = json!({"data": [{"p": 0.9}, {"p": 0.1}, {"p": 0.5, "tenure": 3}]}).to_string();
    let response = test_app().oneshot(post_json("/predict/batch", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let predictions: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["prediction"].as_u64().unwrap())
        .collect();
    assert_eq!(predictions, vec![1, 0, 1]);
}

#[tokio::test]
async fn test_bad_value_is_400_with_message() {
    let body = json!({"data": [{"p": 0.9}, {"p": "high"}]}).to_string();
    let response = test_app().oneshot(post_json("/predict/batch", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("non-numeric"));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let response = test_app()
        .oneshot(post_json("/predict/single", "{\"data\": "))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());
}

#[tokio::test]
async fn test_wrong_payload_shape_is_400() {
    let response = test_app()
        .oneshot(post_json("/predict/single", json!({"data": [1, 2]}).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ui_serves_form() {
    let response = test_app().oneshot(get("/ui")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/predict/single"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = test_app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
