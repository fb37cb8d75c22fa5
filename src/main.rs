//! Chatbot Proxy - Main entry point
//!
//! Loads configuration from the environment, builds the shared completion
//! client once and serves the HTTP API.

use anyhow::Result;
use chatbot_proxy::{
    api::{build_router, AppState},
    core::{init_metrics, AppConfig},
    services::CompletionClient,
};
use chrono::Local;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Custom time formatter that uses local timezone (respects TZ environment variable)
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

fn init_tracing() {
    // NO_COLOR disables ANSI codes when logging to a file
    let no_color = std::env::var("NO_COLOR").is_ok();

    let base_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,chatbot_proxy=debug".to_string());

    // Always suppress noisy HTTP library logs regardless of RUST_LOG setting
    let filter = tracing_subscriber::EnvFilter::new(format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base_filter
    ));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTime)
                .with_ansi(!no_color),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    init_tracing();
    init_metrics();

    let config = AppConfig::from_env()?;
    tracing::info!(
        api_base = %config.upstream.api_base,
        verify_ssl = config.verify_ssl,
        request_timeout_secs = config.request_timeout_secs,
        "Configuration loaded"
    );

    let completion_client = CompletionClient::new(&config)?;
    let state = Arc::new(AppState::new(completion_client));
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting chatbot proxy on {}", addr);
    tracing::info!("Endpoints: /test/, /chat/, /metrics, /swagger-ui");

    axum::serve(listener, app).await?;

    Ok(())
}
