//! Application entry point.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_gateway::api::create_router;
use marketplace_gateway::app::AppState;
use marketplace_gateway::infra::{BackendConfig, HttpBackendClient};

/// Application configuration
struct Config {
    host: String,
    port: u16,
    /// Emit JSON log lines instead of the human-readable format
    json_logs: bool,
    backend: BackendConfig,
}

impl Config {
    fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let json_logs = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let backend = BackendConfig::from_env().context("Invalid backend configuration")?;

        Ok(Self {
            host,
            port,
            json_logs,
            backend,
        })
    }
}

fn init_tracing(json_logs: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    info!("🌾 Marketplace Gateway v{}", env!("CARGO_PKG_VERSION"));

    info!("📦 Initializing backend client...");
    let backend_client = HttpBackendClient::new(&config.backend)?;
    info!("   ✓ Backend: {}", backend_client.base_url());
    info!(
        "   ✓ Upstream timeout: {}ms, request deadline: {}ms",
        config.backend.upstream_timeout_ms, config.backend.request_deadline_ms
    );
    info!("   ✓ Retry preset: {}", config.backend.retry_preset);

    if env::var("BACKEND_API_URL").is_err() && env::var("PUBLIC_API_URL").is_err() {
        warn!("   ⚠ No backend URL configured - using built-in fallback");
    }

    let app_state = Arc::new(AppState::new(Arc::new(backend_client), config.backend.clone()));
    let router = create_router(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 Server starting on http://{}", addr);
    info!("📖 Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
