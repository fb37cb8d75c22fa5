//! API request and response models.
//!
//! This module defines the inbound chat contract, the fixed two-turn
//! conversation sent upstream, and the completion API wire format.

use crate::core::config::{COMPLETION_MODEL, MAX_COMPLETION_TOKENS, SYSTEM_PROMPT};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Greeting returned by the health-check endpoint.
pub const HEALTH_MESSAGE: &str = "Hello, chatbot!";

/// Error returned when `/chat/` is called with anything but POST.
pub const INVALID_METHOD_MESSAGE: &str = "Invalid request method";

/// Inbound chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"message": "Hello!"}))]
pub struct ChatRequest {
    /// User message; a missing or null field is treated as an empty string
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Chat reply relayed from the completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"message": "Hi! How can I help you today?"}))]
pub struct ChatResponse {
    /// Content of the first completion choice
    pub message: String,
}

/// Health-check body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"message": "Hello, chatbot!"}))]
pub struct HealthResponse {
    pub message: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            message: HEALTH_MESSAGE.to_string(),
        }
    }
}

/// Body returned with HTTP 200 when `/chat/` receives a non-POST request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"error": "Invalid request method"}))]
pub struct MethodErrorResponse {
    pub error: String,
}

impl Default for MethodErrorResponse {
    fn default() -> Self {
        Self {
            error: INVALID_METHOD_MESSAGE.to_string(),
        }
    }
}

/// Structured error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": {
        "message": "Request body is not valid JSON",
        "type": "invalid_request_error",
        "code": 400
    }
}))]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: u16,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of the conversation sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Build the fixed two-turn conversation: system prompt, then the user's message.
pub fn build_conversation(message: impl Into<String>) -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::system(SYSTEM_PROMPT),
        ConversationTurn::user(message),
    ]
}

/// Outbound chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ConversationTurn],
    pub max_tokens: u32,
}

impl<'a> CompletionRequest<'a> {
    /// Request with the fixed model and token cap.
    pub fn new(messages: &'a [ConversationTurn]) -> Self {
        Self {
            model: COMPLETION_MODEL,
            messages,
            max_tokens: MAX_COMPLETION_TOKENS,
        }
    }
}

/// Completion API response. Only the fields the proxy reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,

    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics. Missing counters decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Error envelope returned by the completion API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: UpstreamErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorDetail {
    pub message: String,
}
