use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};
use tracing::info;

use crate::config::StorageConfig;
use crate::handlers::{
    create_api_router, handle_panic, health_check, metrics_handler, route_not_found,
    security_headers_middleware, ApiState,
};
use crate::models::RepositoryResult;
use crate::observability::{observability_middleware, Metrics, OperationTracer, StorageTracer};
use crate::repositories::{FileCartRepository, FileProductRepository};
use crate::services::{CartService, ProductService};

/// Build the repositories and services over the configured collection files.
///
/// Missing files are created first when `create_missing_files` is set, so the
/// product id sequence is seeded from what is actually on disk.
pub async fn build_api_state(
    storage: &StorageConfig,
    metrics: Arc<Metrics>,
) -> RepositoryResult<ApiState> {
    let storage_tracer = StorageTracer::new(metrics.clone());

    let product_repository = FileProductRepository::new(storage.products_file.clone())
        .with_tracer(storage_tracer.clone());
    let cart_repository =
        FileCartRepository::new(storage.carts_file.clone()).with_tracer(storage_tracer);

    if storage.create_missing_files {
        product_repository.ensure_exists().await?;
        cart_repository.ensure_exists().await?;
    }

    info!(
        products_file = %storage.products_file.display(),
        carts_file = %storage.carts_file.display(),
        "Repositories initialized"
    );

    let product_service = ProductService::initialize(Arc::new(product_repository)).await;
    let cart_service = CartService::new(Arc::new(cart_repository));

    Ok(ApiState {
        product_service: Arc::new(product_service),
        cart_service: Arc::new(cart_service),
        tracer: Arc::new(OperationTracer::new(metrics)),
    })
}

/// Assemble the full router: health, metrics, the product/cart API and middleware
pub fn create_app(metrics: Arc<Metrics>, api_state: ApiState, max_request_size: usize) -> Router {
    let metrics_for_middleware = metrics.clone();

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .merge(create_api_router(api_state))
        .fallback(route_not_found)
        // Layers run outer to inner from the bottom up
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
