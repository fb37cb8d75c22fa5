//! HTTP middleware for request tracking and metrics.
//!
//! This module provides middleware that tags every request with a request ID,
//! records duration, active requests and status codes, and applies CORS.

use crate::core::logging::{generate_request_id, REQUEST_ID};
use crate::core::metrics::get_metrics;
use axum::{
    extract::{MatchedPath, Request},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use prometheus::Gauge;
use std::time::Instant;
use tower::{Layer, ServiceExt};
use tower_http::cors::CorsLayer;

/// Header carrying the request ID in both directions.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest inbound request ID that is accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Assign a request ID and run the rest of the stack inside its scope.
///
/// An inbound `x-request-id` is reused when it is short and printable;
/// otherwise a fresh UUID is generated. The ID is echoed in the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let mut response = REQUEST_ID
        .scope(request_id.clone(), next.run(request))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}

/// Whether the request is a CORS preflight: `OPTIONS` with both `Origin`
/// and `Access-Control-Request-Method`.
pub fn is_cors_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(header::ORIGIN)
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Permissive CORS that only intercepts real preflights.
///
/// `CorsLayer` answers every `OPTIONS` request itself. A bare `OPTIONS`
/// without the preflight headers is passed straight to the routes instead,
/// so `/test/` and `/chat/` see it like any other method.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS && !is_cors_preflight(&request) {
        return next.run(request).await;
    }

    match CorsLayer::permissive().layer(next).oneshot(request).await {
        Ok(response) => response,
        Err(infallible) => match infallible {},
    }
}

/// Keeps the active-requests gauge balanced even when the request future is
/// dropped before completion (client disconnect).
struct ActiveRequestGuard(Gauge);

impl ActiveRequestGuard {
    fn new(gauge: Gauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Metrics middleware for tracking request statistics.
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Track request metrics.
    ///
    /// Records request count, duration and active requests. The endpoint label
    /// is the matched route so unknown paths do not create new series.
    pub async fn track_metrics(request: Request, next: Next) -> Response {
        let endpoint = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "unmatched".to_string());
        let method = request.method().to_string();

        // Skip metrics endpoint itself to avoid recursion
        if endpoint == "/metrics" {
            return next.run(request).await;
        }

        let metrics = get_metrics();
        let active =
            ActiveRequestGuard::new(metrics.active_requests.with_label_values(&[&endpoint]));

        let start = Instant::now();
        let response = next.run(request).await;
        let duration = start.elapsed().as_secs_f64();

        drop(active);

        let status_code = response.status().as_u16().to_string();
        metrics
            .request_count
            .with_label_values(&[&method, &endpoint, &status_code])
            .inc();
        metrics
            .request_duration
            .with_label_values(&[&method, &endpoint])
            .observe(duration);

        tracing::debug!(
            method = %method,
            endpoint = %endpoint,
            status = %status_code,
            duration_ms = (duration * 1000.0) as u64,
            "Request completed"
        );

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging::get_request_id;
    use axum::{
        body::Body,
        http::{self, StatusCode},
        routing::{any, get},
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn echo_router() -> Router {
        Router::new()
            .route("/echo", get(|| async { get_request_id() }))
            .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    fn method_router() -> Router {
        Router::new()
            .route("/method", any(|method: Method| async move { method.to_string() }))
            .layer(axum::middleware::from_fn(cors_middleware))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let response = echo_router()
            .oneshot(http::Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get("x-request-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(header.len(), 36);
        assert_eq!(body_string(response).await, header);
    }

    #[tokio::test]
    async fn test_reuses_inbound_request_id() {
        let response = echo_router()
            .oneshot(
                http::Request::builder()
                    .uri("/echo")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");
        assert_eq!(body_string(response).await, "abc-123");
    }

    #[tokio::test]
    async fn test_oversized_request_id_is_replaced() {
        let oversized = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let response = echo_router()
            .oneshot(
                http::Request::builder()
                    .uri("/echo")
                    .header("x-request-id", oversized.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(
            response.headers().get("x-request-id").unwrap(),
            oversized.as_str()
        );
    }

    #[tokio::test]
    async fn test_track_metrics_counts_matched_route() {
        let metrics = get_metrics();
        let before = metrics
            .request_count
            .with_label_values(&["GET", "/echo", "200"])
            .get();

        echo_router()
            .oneshot(http::Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let after = metrics
            .request_count
            .with_label_values(&["GET", "/echo", "200"])
            .get();
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_bare_options_reaches_handler() {
        let response = method_router()
            .oneshot(
                http::Request::builder()
                    .method("OPTIONS")
                    .uri("/method")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OPTIONS");
    }

    #[tokio::test]
    async fn test_options_with_origin_only_reaches_handler() {
        let response = method_router()
            .oneshot(
                http::Request::builder()
                    .method("OPTIONS")
                    .uri("/method")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "OPTIONS");
    }

    #[tokio::test]
    async fn test_preflight_answered_by_cors() {
        let response = method_router()
            .oneshot(
                http::Request::builder()
                    .method("OPTIONS")
                    .uri("/method")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_cross_origin_response_gets_cors_headers() {
        let response = method_router()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri("/method")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert_eq!(body_string(response).await, "POST");
    }

    #[test]
    fn test_active_request_guard_decrements_on_drop() {
        let gauge = get_metrics()
            .active_requests
            .with_label_values(&["/guard-test/"]);
        let before = gauge.get();

        let guard = ActiveRequestGuard::new(gauge.clone());
        assert_eq!(gauge.get(), before + 1.0);
        drop(guard);
        assert_eq!(gauge.get(), before);
    }

    #[tokio::test]
    async fn test_active_requests_restored_when_request_is_cancelled() {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "done"
                }),
            )
            .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics));
        let gauge = get_metrics().active_requests.with_label_values(&["/slow"]);
        let before = gauge.get();

        let request =
            router.oneshot(http::Request::builder().uri("/slow").body(Body::empty()).unwrap());
        let result = tokio::time::timeout(Duration::from_millis(50), request).await;

        assert!(result.is_err());
        assert_eq!(gauge.get(), before);
    }
}
