//! HTTP tests driving the router in-process.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use basket_api::{create_app, AppState};
use basket_core::BasketConfig;
use serde_json::Value;
use tower::ServiceExt;

fn catalog_path() -> String {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = std::path::Path::new(&manifest_dir).parent().unwrap().parent().unwrap();
    workspace_root
        .join("testing/fixtures/catalog.yaml")
        .to_string_lossy()
        .to_string()
}

fn app() -> Router {
    let mut config = BasketConfig::default();
    config.catalog.path = catalog_path();
    let state = AppState::from_config(&config).unwrap();
    create_app(state, &[])
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_str(&body).unwrap())
}

async fn post_basket(app: Router, body: &'static str) -> (StatusCode, Value) {
    let request = Request::post("/api/generate-basket")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_index_and_health() {
    let (status, json) = get_json(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], "1.0.0");

    let (status, json) = get_json(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pipeline_ready"], true);
    assert!(json["catalog_version"].as_str().unwrap().starts_with("blake3:"));
}

#[tokio::test]
async fn test_generate_basket() {
    let (status, json) = post_basket(app(), r#"{"query": "ужин на двоих за 1500 без молока"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["parsed"]["people"], 2);
    assert_eq!(json["parsed"]["budget_rub"], 1500.0);
    assert_eq!(json["summary"]["within_budget"], true);
    assert_eq!(json["metadata"]["scenario_used"], "classic_dinner");
    assert_eq!(json["stages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_body_and_empty_query_are_rejected() {
    let (status, json) = post_basket(app(), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");

    let (status, json) = post_basket(app(), r#"{"query": "  "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "EmptyQuery");

    let (status, _) = post_basket(app(), r#"{}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_basket(app(), "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "InvalidBody");
}

#[tokio::test]
async fn test_pipeline_error_is_an_envelope() {
    let (status, json) = post_basket(app(), r#"{"query": "перекус"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["type"], "NoScenarioMatch");
    assert!(json["message"].is_string());
    assert_eq!(json["basket"], serde_json::json!([]));
}

#[tokio::test]
async fn test_products_filters() {
    let (status, json) = get_json(app(), "/api/products?role=drink&max_price=100").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = json["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![31, 32]);

    let (_, json) = get_json(app(), "/api/products?tag=dairy&limit=2").await;
    assert_eq!(json["count"], 2);

    let (_, json) = get_json(app(), "/api/products").await;
    assert_eq!(json["count"], 20);
}

#[tokio::test]
async fn test_stats() {
    let (status, json) = get_json(app(), "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["total_products"], 26);
    assert_eq!(json["stats"]["scenarios_count"], 4);
    assert_eq!(json["stats"]["roles_count"], 9);
}

#[tokio::test]
async fn test_metrics_after_request() {
    let app = app();
    post_basket(app.clone(), r#"{"query": "ужин"}"#).await;

    let (status, body) = send(app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("basket_requests_total{status=\"success\"} 1"));
}
