// complexity-api-rs/src/main.rs
// Code Complexity Analyzer API - HTTP relay to the Gemini API
// Port 10000 by default (PORT or COMPLEXITY_API_SERVICE_PORT override it)
//
// Implements:
// - POST /api/analyze with payload validation and error classification
// - GET /api/status and GET /health
// - CORS, security headers, body size limit and per-client rate limiting

use std::net::SocketAddr;
use std::sync::Arc;

use complexity_api::config::{ApiConfig, DEFAULT_PORT, SERVICE_NAME};
use complexity_api::llm_client::{GeminiClient, GenerativeModel};
use complexity_api::logging::{init_tracing, json_requested};
use complexity_api::ComplexityApi;
use config_rs::{get_bind_address, load_dotenv};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    load_dotenv();
    init_tracing(json_requested());

    let config = ApiConfig::from_env();

    let client = GeminiClient::new(&config.gemini)?;
    tracing::info!("Using Gemini model: {}", client.model());
    if !client.is_configured() {
        tracing::warn!("GEMINI_API_KEY is not set; analysis requests will fail with CONFIG_ERROR");
    }

    let api = Arc::new(ComplexityApi::new(config.clone(), Arc::new(client)));

    if config.verify_model_on_start {
        if api.analysis().test_connection().await {
            tracing::info!("Gemini API connection verified");
        } else {
            tracing::warn!("Gemini API connection test failed; continuing startup");
        }
    }

    let _pruner = api.rate_limiter().spawn_pruner();
    let app = api.clone().create_router();

    let addr = get_bind_address(SERVICE_NAME, DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Complexity Analyzer API listening on {}", addr);
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Rate limit: {}", config.rate_limit.describe());
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
