//! API Handlers
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use basket_core::{BasketError, BASKET_VERSION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{error, info};

use crate::AppState;

/// Default page size of `/api/products`
pub const DEFAULT_PRODUCT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub role: Option<String>,
    pub tag: Option<String>,
    pub max_price: Option<f64>,
    pub limit: Option<usize>,
}

fn rejection(message: impl Into<String>, kind: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "status": "error",
            "message": message.into(),
            "type": kind,
        })),
    )
}

pub async fn index() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "message": "🛒 Basket Debate API",
            "version": BASKET_VERSION,
            "endpoints": {
                "health": "/health",
                "generate_basket": "/api/generate-basket (POST)",
                "products": "/api/products (GET)",
                "stats": "/api/stats (GET)",
                "metrics": "/metrics (GET)"
            }
        })),
    )
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let snapshot = state.pipeline.catalog().snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "basket-debate-api",
            "version": BASKET_VERSION,
            "pipeline_ready": !snapshot.catalog.scenarios().is_empty(),
            "parser": state.pipeline.parser().source_name(),
            "catalog_version": snapshot.version,
            "catalog_loaded_at": snapshot.loaded_at,
        })),
    )
}

pub async fn generate_basket(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        state.metrics.reject();
        return rejection("Request body is required", "EmptyBody").into_response();
    }
    let request: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            state.metrics.reject();
            return rejection(format!("Invalid request body: {}", e), "InvalidBody").into_response();
        }
    };

    let start = Instant::now();
    match state.pipeline.handle(&request.query).await {
        Ok(result) => {
            let status = if result.is_success() { "success" } else { "error" };
            state.metrics.observe(status, start.elapsed().as_secs_f64());
            info!(status, items = result.basket.len(), "basket request handled");
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e @ BasketError::EmptyQuery) => {
            state.metrics.reject();
            rejection(e.to_string(), e.kind()).into_response()
        }
        Err(e) => {
            error!(error = %e, "basket request failed outside the pipeline");
            state.metrics.observe("error", start.elapsed().as_secs_f64());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string(), "type": e.kind() })),
            )
                .into_response()
        }
    }
}

pub async fn products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> (StatusCode, Json<Value>) {
    let snapshot = state.pipeline.catalog().snapshot();
    let limit = params.limit.unwrap_or(DEFAULT_PRODUCT_LIMIT);

    let products: Vec<_> = snapshot
        .catalog
        .products()
        .iter()
        .filter(|p| params.role.as_deref().map_or(true, |r| p.ingredient_role == r))
        .filter(|p| params.tag.as_deref().map_or(true, |t| p.tags.contains(t)))
        .filter(|p| params.max_price.map_or(true, |max| p.price_per_unit <= max))
        .take(limit)
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "count": products.len(),
            "products": products,
        })),
    )
}

pub async fn stats(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let snapshot = state.pipeline.catalog().snapshot();
    let catalog = &snapshot.catalog;
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "stats": {
                "total_products": catalog.products().len(),
                "scenarios_count": catalog.scenarios().len(),
                "roles_count": catalog.roles().count(),
                "avg_price": catalog.average_price(),
                "catalog_version": snapshot.version,
                "loaded_at": snapshot.loaded_at,
            }
        })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
