//! API layer for the chatbot proxy.
//!
//! This module contains the HTTP handlers, request/response models,
//! OpenAPI document and router.

pub mod handlers;
pub mod models;
pub mod openapi;
pub mod routes;

// Re-export commonly used types
pub use handlers::{chat, health_check, metrics_handler, parse_chat_request, AppState};
pub use models::{
    build_conversation, ChatRequest, ChatResponse, ConversationTurn, HealthResponse,
    MethodErrorResponse, Role,
};
pub use openapi::ApiDoc;
pub use routes::build_router;
