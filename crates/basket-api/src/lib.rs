//! Basket API: REST endpoints over the basket pipeline
pub mod handlers;
pub mod metrics;
pub mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use basket_core::{BasketConfig, BasketError, Catalog, CatalogSnapshot, CatalogStore};
use basket_stages::BasketPipeline;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::metrics::ApiMetrics;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Basket(#[from] BasketError),
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handler state; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<BasketPipeline>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(pipeline: BasketPipeline) -> Result<Self, prometheus::Error> {
        Ok(Self {
            pipeline: Arc::new(pipeline),
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }

    /// Load the catalog and build the pipeline described by `config`.
    pub fn from_config(config: &BasketConfig) -> Result<Self, ServeError> {
        let catalog = Catalog::load(&config.catalog.path)?;
        let store = Arc::new(CatalogStore::new(CatalogSnapshot::new(catalog)?));
        let pipeline = BasketPipeline::from_config(config, store)?;
        Ok(Self::new(pipeline)?)
    }
}

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/generate-basket", post(handlers::generate_basket))
        .route("/api/products", get(handlers::products))
        .route("/api/stats", get(handlers::stats))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::cors(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: BasketConfig) -> Result<(), ServeError> {
    let state = AppState::from_config(&config)?;
    {
        let snapshot = state.pipeline.catalog().snapshot();
        tracing::info!(
            path = %config.catalog.path,
            version = %snapshot.version,
            products = snapshot.catalog.products().len(),
            scenarios = snapshot.catalog.scenarios().len(),
            parser = state.pipeline.parser().source_name(),
            "catalog loaded"
        );
    }

    let app = create_app(state, &config.server.cors_origins);
    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;

    tracing::info!("Basket API listening on {}", config.server.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
