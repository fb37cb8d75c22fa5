//! Configuration management for the chatbot proxy.
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file by the binary). Only connection settings are configurable; the
//! model, token cap and system prompt are fixed constants.

use anyhow::{bail, Result};
use std::fmt;
use std::net::Ipv6Addr;

/// Model identifier sent with every completion request.
pub const COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// Maximum number of tokens the upstream model may generate per reply.
pub const MAX_COMPLETION_TOKENS: u32 = 100;

/// System turn prepended to every conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server configuration (host, port)
    pub server: ServerConfig,

    /// Completion API connection settings
    pub upstream: UpstreamConfig,

    /// Whether to verify SSL certificates for upstream requests
    pub verify_ssl: bool,

    /// Upstream request timeout in seconds, always at least 1
    pub request_timeout_secs: u64,
}

/// Server-specific configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to: a hostname, an IPv4 address or an IPv6 address
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Connection settings for the completion API.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base URL, without trailing slash (e.g. `https://api.openai.com/v1`)
    pub api_base: String,

    /// Bearer credential for the completion API
    pub api_key: String,
}

impl UpstreamConfig {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: normalize_api_base(&api_base.into()),
            api_key: api_key.into(),
        }
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    60
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required. `HOST`, `PORT`, `OPENAI_API_BASE`,
    /// `VERIFY_SSL` and `REQUEST_TIMEOUT_SECS` are optional; values that fail
    /// to parse fall back to their defaults, and so does a zero timeout.
    pub fn from_env() -> Result<Self> {
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => bail!("OPENAI_API_KEY environment variable is required"),
        };

        let api_base = std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| default_api_base());

        let mut server = ServerConfig::default();
        if let Ok(host) = std::env::var("HOST") {
            server.host = host;
        }
        if let Some(port) = parse_env::<u16>("PORT") {
            server.port = port;
        }

        let verify_ssl = std::env::var("VERIFY_SSL")
            .map(|v| str_to_bool(&v))
            .unwrap_or_else(|_| default_verify_ssl());

        let request_timeout_secs = parse_env::<u64>("REQUEST_TIMEOUT_SECS")
            .filter(|secs| {
                if *secs == 0 {
                    tracing::warn!(
                        variable = "REQUEST_TIMEOUT_SECS",
                        "Zero timeout is not allowed, using default"
                    );
                }
                *secs > 0
            })
            .unwrap_or_else(default_request_timeout);

        Ok(Self {
            server,
            upstream: UpstreamConfig::new(api_base, api_key),
            verify_ssl,
            request_timeout_secs,
        })
    }

    /// Address string the server binds to. Bare IPv6 hosts are bracketed.
    pub fn bind_address(&self) -> String {
        let host = self.server.host.trim();
        if host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", host, self.server.port)
        } else {
            format!("{}:{}", host, self.server.port)
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable value, using default");
            None
        }
    }
}

fn normalize_api_base(api_base: &str) -> String {
    api_base.trim().trim_end_matches('/').to_string()
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
