//! Error types and handling for the chatbot proxy.
//!
//! This module provides a unified error type [`AppError`] that wraps the
//! failure sources of a chat request and converts them into JSON HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error `type` reported for problems with the caller's request.
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
/// Error `type` reported when the completion API fails or misbehaves.
pub const ERROR_TYPE_UPSTREAM: &str = "upstream_error";
/// Error `type` reported when the completion API does not answer in time.
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";
/// Error `type` for everything else.
pub const ERROR_TYPE_INTERNAL: &str = "internal_error";

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport errors from the reqwest client
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Client provided an unparsable or wrongly-typed body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body exceeds the size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The completion API answered, but not with a usable completion
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and error `type` for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ERROR_TYPE_INTERNAL),
            AppError::Request(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, ERROR_TYPE_TIMEOUT)
            }
            AppError::Request(_) | AppError::Upstream { .. } => {
                (StatusCode::BAD_GATEWAY, ERROR_TYPE_UPSTREAM)
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, ERROR_TYPE_INVALID_REQUEST),
            AppError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, ERROR_TYPE_INVALID_REQUEST)
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Request(e) if e.is_timeout() => "Gateway timeout".to_string(),
            // reqwest errors embed the upstream URL; keep it out of client responses
            AppError::Request(e) if e.is_connect() => {
                "Failed to connect to completion API".to_string()
            }
            AppError::Request(_) => "Completion API request failed".to_string(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::BadRequest(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.classify();
        let message = self.client_message();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
