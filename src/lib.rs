//! Chatbot Proxy - a single-endpoint relay to a chat completion API
//!
//! The server accepts a user message, wraps it in a fixed two-turn
//! conversation (system prompt + user message), forwards it to the upstream
//! completion API and returns the first choice's text.
//!
//! # Architecture
//!
//! - [`core`]: Configuration, errors, logging context, metrics, middleware
//! - [`api`]: HTTP handlers, request/response models, router, OpenAPI document
//! - [`services`]: Upstream completion API client
//!
//! # Endpoints
//!
//! | Path | Method | Response |
//! |---|---|---|
//! | `/test/` | any | `{"message": "Hello, chatbot!"}` |
//! | `/chat/` | POST | `{"message": <reply>}` |
//! | `/chat/` | other | 200 `{"error": "Invalid request method"}` |
//! | `/metrics` | GET | Prometheus text format |
//! | `/swagger-ui` | GET | API documentation |
//!
//! # Configuration
//!
//! Required environment variables:
//! - `OPENAI_API_KEY`: Credential for the completion API
//!
//! Optional environment variables:
//! - `OPENAI_API_BASE`: Completion API base URL (default: https://api.openai.com/v1)
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8000)
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Upstream request timeout in seconds (default: 60)

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use crate::api::{build_router, AppState, ChatRequest, ChatResponse, ConversationTurn};
pub use crate::core::{AppConfig, AppError, Result};
pub use crate::services::CompletionClient;
