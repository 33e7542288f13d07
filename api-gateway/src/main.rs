// ==============================================================================
// main.rs - Auth Gateway Entry Point
// ==============================================================================
// Description: Axum server that authenticates and routes service traffic
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auth_gateway::{build_router, config::LogFormat, AppState, GatewayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env().context("Failed to load gateway configuration")?;

    init_tracing(config.log_format);

    info!("Starting Auth Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        user = %config.services.user,
        room = %config.services.room,
        vote = %config.services.vote,
        auth = %config.services.auth,
        auth_timeout_ms = config.auth_timeout.as_millis() as u64,
        "Downstream services configured"
    );

    let port = config.port;

    // Initialize application state
    let state = AppState::new(config).context("Failed to initialize application state")?;

    let app = build_router(state);

    // Bind server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Auth Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Auth Gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
            return;
        }
        info!("Received SIGINT (Ctrl+C)");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM");
            }
            Err(error) => {
                warn!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
