use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, instrument, warn};

use crate::models::{
    Cart, CartLineItem, DeleteProductResponse, Product, ProductPayload, ServiceError,
};
use crate::observability::OperationTracer;
use crate::services::{CartService, ProductService};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

/// Shared application state containing all services
#[derive(Clone)]
pub struct ApiState {
    pub product_service: Arc<ProductService>,
    pub cart_service: Arc<CartService>,
    pub tracer: Arc<OperationTracer>,
}

/// Query parameters for listing products
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub limit: Option<String>,
}

/// Create API router with all product and cart endpoints
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:pid",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/carts", post(create_cart))
        .route("/api/carts/:cid", get(get_cart))
        .route("/api/carts/:cid/product/:pid", post(add_product_to_cart))
        .with_state(state)
}

// =============================================================================
// PRODUCT ENDPOINTS
// =============================================================================

/// List products, optionally keeping only the first `limit`
#[instrument(name = "list_products", skip(state))]
pub async fn list_products(
    State(state): State<ApiState>,
    Query(query): Query<ListProductsQuery>,
) -> ApiResult<Vec<Product>> {
    let limit = query.limit.as_deref().and_then(parse_limit);

    state
        .tracer
        .trace_product_operation("list", state.product_service.list_products(limit))
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to fetch products"))
}

#[instrument(name = "get_product", skip(state))]
pub async fn get_product(
    State(state): State<ApiState>,
    Path(pid): Path<String>,
) -> ApiResult<Product> {
    state
        .tracer
        .trace_product_operation("get", state.product_service.get_product(&pid))
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to fetch product"))
}

#[instrument(name = "create_product", skip(state, body))]
pub async fn create_product(State(state): State<ApiState>, body: Bytes) -> ApiResult<Product> {
    let payload = parse_payload(&body).map_err(|err| service_error_to_response(err, ""))?;

    state
        .tracer
        .trace_product_operation("create", state.product_service.create_product(payload))
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to add product"))
}

#[instrument(name = "update_product", skip(state, body))]
pub async fn update_product(
    State(state): State<ApiState>,
    Path(pid): Path<String>,
    body: Bytes,
) -> ApiResult<Product> {
    let payload = parse_payload(&body).map_err(|err| service_error_to_response(err, ""))?;

    state
        .tracer
        .trace_product_operation(
            "update",
            state.product_service.update_product(&pid, payload),
        )
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to update product"))
}

/// Delete a product; unknown ids are confirmed all the same
#[instrument(name = "delete_product", skip(state))]
pub async fn delete_product(
    State(state): State<ApiState>,
    Path(pid): Path<String>,
) -> ApiResult<DeleteProductResponse> {
    state
        .tracer
        .trace_product_operation("delete", state.product_service.delete_product(&pid))
        .await
        .map(|_| {
            Json(DeleteProductResponse {
                message: "Product deleted successfully".to_string(),
            })
        })
        .map_err(|err| service_error_to_response(err, "Failed to delete product"))
}

// =============================================================================
// CART ENDPOINTS
// =============================================================================

#[instrument(name = "create_cart", skip(state))]
pub async fn create_cart(State(state): State<ApiState>) -> ApiResult<Cart> {
    state
        .tracer
        .trace_cart_operation("create", None, state.cart_service.create_cart())
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to create cart"))
}

/// Get the line items of a cart
#[instrument(name = "get_cart", skip(state))]
pub async fn get_cart(
    State(state): State<ApiState>,
    Path(cid): Path<String>,
) -> ApiResult<Vec<CartLineItem>> {
    state
        .tracer
        .trace_cart_operation(
            "get_products",
            Some(&cid),
            state.cart_service.get_cart_products(&cid),
        )
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to fetch cart"))
}

#[instrument(name = "add_product_to_cart", skip(state))]
pub async fn add_product_to_cart(
    State(state): State<ApiState>,
    Path((cid, pid)): Path<(String, String)>,
) -> ApiResult<Cart> {
    state
        .tracer
        .trace_cart_operation(
            "add_product",
            Some(&cid),
            state.cart_service.add_product_to_cart(&cid, &pid),
        )
        .await
        .map(Json)
        .map_err(|err| service_error_to_response(err, "Failed to add product to cart"))
}

// =============================================================================
// HELPERS
// =============================================================================

/// Parse a request body into a product payload.
///
/// An empty body is an empty payload; anything else must be a JSON object.
pub fn parse_payload(body: &[u8]) -> Result<ProductPayload, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProductPayload::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err(ServiceError::InvalidPayload {
            message: "request body must be a JSON object".to_string(),
        }),
        Err(e) => Err(ServiceError::InvalidPayload {
            message: e.to_string(),
        }),
    }
}

/// Parse the `limit` query value as a whole number.
///
/// Only an empty value means "no limit". Surrounding whitespace is ignored,
/// fractions are truncated, and anything that is not a number (`abc`, `3x`)
/// or is not positive keeps nothing.
pub fn parse_limit(raw: &str) -> Option<usize> {
    if raw.is_empty() {
        return None;
    }

    // Saturating cast: NaN and negatives become 0, infinity keeps everything
    Some(parse_number(raw.trim()).unwrap_or(0.0).trunc() as usize)
}

/// Numeric literal parse: decimal with optional sign and exponent,
/// `0x`/`0o`/`0b` integers, and `Infinity`. Blank input is zero.
fn parse_number(text: &str) -> Option<f64> {
    if text.is_empty() {
        return Some(0.0);
    }

    let radix = match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };

    if let Some(radix) = radix {
        let digits = &text[2..];
        if digits.is_empty() {
            return None;
        }
        return digits.chars().try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix)
                .map(|digit| acc * f64::from(radix) + f64::from(digit))
        });
    }

    // f64 parsing also accepts "inf" and "nan" spellings that are not numbers here
    let unsigned = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) && unsigned != "Infinity" {
        return None;
    }

    text.parse().ok()
}

/// Convert ServiceError to HTTP response.
///
/// Storage failures are reported with `failure_message` only; the cause is
/// logged but never returned to the caller.
pub fn service_error_to_response(
    err: ServiceError,
    failure_message: &str,
) -> (StatusCode, Json<Value>) {
    let (status, message) = match &err {
        ServiceError::ProductNotFound { .. } | ServiceError::CartNotFound { .. } => {
            warn!("{}", err);
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ServiceError::InvalidPayload { .. } => {
            warn!("{}", err);
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        ServiceError::Repository { source } => {
            error!(error = %source, "{}", failure_message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                failure_message.to_string(),
            )
        }
    };

    (status, Json(json!({ "error": message })))
}
