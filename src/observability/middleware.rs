use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};

use super::tracing::get_current_trace_id;
use super::Metrics;

/// Middleware for request tracing and HTTP metrics
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .unwrap_or("unknown")
        .trim()
        .to_string();

    // Group by route template so path ids don't explode label cardinality
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "storefront_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        let _in_flight = InFlightGuard::enter(metrics.clone(), &method, &endpoint);

        let trace_id = get_current_trace_id().unwrap_or_default();
        info!(trace_id = %trace_id, method = %method, path = %uri, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        tracing::Span::current().record("http.status_code", status_code);
        tracing::Span::current().record("http.response_time_ms", duration_ms);

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());

        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %uri,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request failed"
            );
        } else if status_code >= 400 {
            warn!(
                trace_id = %trace_id,
                method = %method,
                path = %uri,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request rejected"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %uri,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed successfully"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Holds one slot of the in-flight gauge until dropped, including when the
/// request future is cancelled
struct InFlightGuard {
    metrics: Arc<Metrics>,
    method: String,
    endpoint: String,
}

impl InFlightGuard {
    fn enter(metrics: Arc<Metrics>, method: &str, endpoint: &str) -> Self {
        metrics.increment_in_flight(method, endpoint);
        Self {
            metrics,
            method: method.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.decrement_in_flight(&self.method, &self.endpoint);
    }
}

/// Times collection file reads and writes and records them as storage metrics
#[derive(Clone)]
pub struct StorageTracer {
    metrics: Arc<Metrics>,
}

impl StorageTracer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    #[instrument(skip_all, fields(operation = %operation, collection = %collection))]
    pub async fn trace_operation<F, T, E>(
        &self,
        operation: &str,
        collection: &str,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;
        let duration = start_time.elapsed();

        self.metrics.record_storage_operation(
            operation,
            collection,
            result.is_ok(),
            duration.as_secs_f64(),
        );

        if let Err(error) = &result {
            error!(
                error = %error,
                duration_ms = duration.as_millis(),
                "Storage operation failed"
            );
        }

        result
    }
}

/// Records the outcome of product and cart operations
#[derive(Clone)]
pub struct OperationTracer {
    metrics: Arc<Metrics>,
}

impl OperationTracer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    #[instrument(skip_all, fields(operation = %operation))]
    pub async fn trace_product_operation<F, T, E>(&self, operation: &str, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;

        self.metrics.record_product_operation(operation, result.is_ok());
        log_outcome(&result, start_time, "Product operation");

        result
    }

    #[instrument(skip_all, fields(operation = %operation, cart_id = cart_id))]
    pub async fn trace_cart_operation<F, T, E>(
        &self,
        operation: &str,
        cart_id: Option<&str>,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;

        self.metrics.record_cart_operation(operation, result.is_ok());
        log_outcome(&result, start_time, "Cart operation");

        result
    }
}

fn log_outcome<T, E: std::fmt::Display>(result: &Result<T, E>, start_time: Instant, kind: &str) {
    match result {
        Ok(_) => info!(
            duration_ms = start_time.elapsed().as_millis(),
            "{} completed successfully", kind
        ),
        Err(error) => warn!(
            error = %error,
            duration_ms = start_time.elapsed().as_millis(),
            "{} failed", kind
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "test response"
    }

    async fn error_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn traced_router(metrics: Arc<Metrics>) -> Router {
        Router::new()
            .route("/test/:id", get(test_handler))
            .route("/error", get(error_handler))
            .layer(middleware::from_fn(move |req, next| {
                observability_middleware(metrics.clone(), req, next)
            }))
    }

    #[tokio::test]
    async fn test_observability_middleware_uses_route_template() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = traced_router(metrics.clone());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/test/42")
            .header("user-agent", "test-client/1.0")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("http_requests_total"));
        assert!(encoded.contains("endpoint=\"/test/:id\""));
        assert!(!encoded.contains("/test/42"));
    }

    #[tokio::test]
    async fn test_observability_middleware_error() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = traced_router(metrics.clone());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/error")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("status_code=\"500\""));
    }

    #[tokio::test]
    async fn test_in_flight_gauge_released_when_request_is_abandoned() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                    "late"
                }),
            )
            .layer(middleware::from_fn({
                let metrics = metrics.clone();
                move |req, next| observability_middleware(metrics.clone(), req, next)
            }));

        let in_flight = || {
            metrics
                .http_requests_in_flight
                .with_label_values(&["GET", "/slow"])
                .get()
        };

        let request = tokio::spawn(
            app.oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap()),
        );

        for _ in 0..100 {
            if in_flight() == 1.0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(in_flight(), 1.0);

        // Client went away
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        assert_eq!(in_flight(), 0.0);
    }

    #[tokio::test]
    async fn test_storage_tracer() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let tracer = StorageTracer::new(metrics.clone());

        let ok = tracer
            .trace_operation("read", "products", async { Ok::<_, String>(3) })
            .await;
        assert_eq!(ok, Ok(3));

        let failed = tracer
            .trace_operation("write", "products", async { Err::<(), _>("disk full") })
            .await;
        assert!(failed.is_err());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("storage_operations_total"));
        assert!(encoded.contains("status=\"error\""));
    }

    #[tokio::test]
    async fn test_operation_tracer() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let tracer = OperationTracer::new(metrics.clone());

        let result = tracer
            .trace_product_operation("create", async { Ok::<_, String>("created") })
            .await;
        assert!(result.is_ok());

        let result = tracer
            .trace_cart_operation("add_product", Some("cart-1"), async {
                Err::<(), _>("Cart not found")
            })
            .await;
        assert!(result.is_err());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("product_operations_total"));
        assert!(encoded.contains("cart_operations_total"));
    }
}
