//! Router construction.

use crate::api::handlers::{chat, health_check, metrics_handler, AppState};
use crate::api::openapi::ApiDoc;
use crate::core::{cors_middleware, request_id_middleware, MetricsMiddleware};
use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the application router with all endpoints and middleware.
///
/// `/test/` and `/chat/` accept every method, including a bare `OPTIONS`;
/// only CORS preflights are answered before routing. The slash-less forms
/// route to the same handlers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/test/", any(health_check))
        .route("/test", any(health_check))
        .route("/chat/", any(chat))
        .route("/chat", any(chat))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .with_state(state);

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_ui)
        .merge(api_routes)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(cors_middleware))
        .layer(TraceLayer::new_for_http())
}
