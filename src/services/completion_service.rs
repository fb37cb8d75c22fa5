//! Client for the upstream chat completion API.
//!
//! A single [`CompletionClient`] is built at startup and shared by every
//! request; it holds the pooled HTTP client and the credential and is never
//! mutated afterwards.

use crate::api::models::{
    CompletionRequest, CompletionResponse, ConversationTurn, UpstreamErrorBody, Usage,
};
use crate::core::config::{AppConfig, UpstreamConfig};
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::core::{AppError, Result};
use std::error::Error;
use std::time::{Duration, Instant};

/// Upper bound on upstream error text relayed to clients.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Result of a successful completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Content of the first choice (empty when the API returned null content)
    pub content: String,
    pub usage: Option<Usage>,
}

/// Chat completion API client.
#[derive(Clone)]
pub struct CompletionClient {
    http_client: reqwest::Client,
    upstream: UpstreamConfig,
}

impl CompletionClient {
    /// Create a client with connection pooling and the configured timeout.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self::with_http_client(http_client, config.upstream.clone()))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_http_client(http_client: reqwest::Client, upstream: UpstreamConfig) -> Self {
        Self {
            http_client,
            upstream,
        }
    }

    /// Endpoint the completion request is posted to.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.upstream.api_base)
    }

    /// Send `conversation` to the completion API and return the first choice.
    pub async fn complete(&self, conversation: &[ConversationTurn]) -> Result<Completion> {
        let url = self.endpoint();
        let payload = CompletionRequest::new(conversation);
        let start = Instant::now();

        let result = self.send(&url, &payload).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        get_metrics()
            .upstream_latency
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        if let Ok(completion) = &result {
            if let Some(usage) = &completion.usage {
                record_token_usage(usage);
            }
            tracing::debug!(
                request_id = %get_request_id(),
                model = payload.model,
                content_len = completion.content.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completion received"
            );
        }

        result
    }

    async fn send(&self, url: &str, payload: &CompletionRequest<'_>) -> Result<Completion> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.upstream.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    request_id = %get_request_id(),
                    url = %url,
                    error = %e,
                    error_source = ?e.source(),
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "HTTP request to completion API failed"
                );
                AppError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body)
                .unwrap_or_else(|| format!("Completion API returned status {}", status.as_u16()));
            tracing::error!(
                request_id = %get_request_id(),
                status = status.as_u16(),
                message = %message,
                "Completion API returned an error"
            );
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(
                request_id = %get_request_id(),
                error = %e,
                "Completion API returned an undecodable body"
            );
            AppError::Upstream {
                status: status.as_u16(),
                message: "Completion API returned an invalid response".to_string(),
            }
        })?;

        first_choice(parsed, status.as_u16())
    }
}

fn first_choice(response: CompletionResponse, status: u16) -> Result<Completion> {
    let usage = response.usage;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upstream {
            status,
            message: "Completion API returned no choices".to_string(),
        })?;

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        usage,
    })
}

/// Pull `error.message` out of an upstream error body, if it has one.
fn extract_error_message(body: &str) -> Option<String> {
    let parsed: UpstreamErrorBody = serde_json::from_str(body).ok()?;
    let message = parsed.error.message.trim();
    if message.is_empty() {
        return None;
    }
    Some(truncate_message(message))
}

fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }
    let mut end = MAX_ERROR_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}

fn record_token_usage(usage: &Usage) {
    let metrics = get_metrics();
    for (token_type, count) in [
        ("prompt", usage.prompt_tokens),
        ("completion", usage.completion_tokens),
        ("total", usage.total_tokens),
    ] {
        metrics
            .token_usage
            .with_label_values(&[token_type])
            .inc_by(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{build_conversation, CompletionChoice, CompletionMessage};

    #[test]
    fn test_endpoint_joins_api_base() {
        let client = CompletionClient::with_http_client(
            reqwest::Client::new(),
            UpstreamConfig::new("http://localhost:9000/v1/", "key"),
        );
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Incorrect API key provided")
        );
        assert_eq!(extract_error_message("<html>Bad Gateway</html>"), None);
        assert_eq!(extract_error_message(r#"{"error": {"message": "  "}}"#), None);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short"), "short");

        let long = "é".repeat(MAX_ERROR_MESSAGE_LEN);
        let truncated = truncate_message(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn test_first_choice_takes_first() {
        let response = CompletionResponse {
            choices: vec![
                CompletionChoice {
                    message: CompletionMessage {
                        content: Some("first".to_string()),
                    },
                },
                CompletionChoice {
                    message: CompletionMessage {
                        content: Some("second".to_string()),
                    },
                },
            ],
            usage: None,
        };
        assert_eq!(first_choice(response, 200).unwrap().content, "first");
    }

    #[test]
    fn test_first_choice_empty_is_upstream_error() {
        let response = CompletionResponse {
            choices: vec![],
            usage: None,
        };
        assert!(matches!(
            first_choice(response, 200),
            Err(AppError::Upstream { status: 200, .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_connection_refused() {
        let client = CompletionClient::with_http_client(
            reqwest::Client::new(),
            UpstreamConfig::new("http://127.0.0.1:1", "key"),
        );
        let result = client.complete(&build_conversation("hi")).await;
        assert!(matches!(result, Err(AppError::Request(_))));
    }
}
