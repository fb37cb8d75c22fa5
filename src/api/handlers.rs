//! HTTP request handlers for the chatbot API.
//!
//! This module contains the health-check and chat endpoints and the metrics
//! exposition handler.

use crate::api::models::{
    build_conversation, ChatRequest, ChatResponse, HealthResponse, MethodErrorResponse,
};
use crate::core::logging::get_request_id;
use crate::core::{AppError, Result};
use crate::services::CompletionClient;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequest, Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::Value;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub completion_client: CompletionClient,
}

impl AppState {
    pub fn new(completion_client: CompletionClient) -> Self {
        Self { completion_client }
    }
}

/// Health check
///
/// Answers every method with a fixed greeting. The request is accepted and ignored.
#[utoipa::path(
    method(get, post, put, delete, patch, options),
    path = "/test/",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(_request: Request) -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Chat
///
/// Wraps the caller's message in a system + user conversation, sends it to the
/// completion API and relays the first choice. Non-POST requests receive
/// `{"error": "Invalid request method"}` with status 200.
#[utoipa::path(
    post,
    path = "/chat/",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply, or the invalid-method payload for non-POST requests", body = ChatResponse),
        (status = 400, description = "Body is not a JSON object with a string `message`", body = crate::api::models::ApiErrorResponse),
        (status = 413, description = "Body exceeds the request size limit", body = crate::api::models::ApiErrorResponse),
        (status = 502, description = "Completion API failed", body = crate::api::models::ApiErrorResponse),
        (status = 504, description = "Completion API timed out", body = crate::api::models::ApiErrorResponse)
    )
)]
pub async fn chat(State(state): State<Arc<AppState>>, request: Request) -> Result<Response> {
    // Checked before the body is read so non-POST never hits the size limit.
    if request.method() != Method::POST {
        tracing::debug!(method = %request.method(), "Rejecting non-POST chat request");
        return Ok(Json(MethodErrorResponse::default()).into_response());
    }

    let body = Bytes::from_request(request, &state)
        .await
        .map_err(body_rejection_to_error)?;
    let request = parse_chat_request(&body)?;
    let conversation = build_conversation(request.message);

    tracing::debug!(
        request_id = %get_request_id(),
        message_len = conversation[1].content.len(),
        "Processing chat request"
    );

    let completion = state.completion_client.complete(&conversation).await?;

    Ok(Json(ChatResponse {
        message: completion.content,
    })
    .into_response())
}

/// Parse the raw chat body. The body must be a JSON object; `message` is optional.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Request body is not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid chat request: {}", e)))
}

fn body_rejection_to_error(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(rejection.body_text())
    } else {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Prometheus metrics in the text exposition format.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
