// ==============================================================================
// lib.rs - Auth Gateway Library
// ==============================================================================
// Description: Authenticating reverse proxy in front of the user, room, vote
//              and auth services
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use axum::{http::HeaderValue, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

pub mod auth_client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routing;
pub mod state;
pub mod upstream;

pub use config::GatewayConfig;
pub use state::AppState;

/// Build the gateway router: `/health` plus the catch-all proxy
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config().cors_allowed_origins.as_deref());
    let max_body_bytes = state.config().max_body_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        // Everything else is classified and forwarded
        .fallback(handlers::proxy_request)
        .layer(
            ServiceBuilder::new()
                // Request tracing
                .layer(TraceLayer::new_for_http())
                // Must sit outside CORS: its response body has no Default
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origin = match allowed_origins {
        None => AllowOrigin::from(Any),
        // A literal "*" in a list would panic in tower-http
        Some(origins) if origins.iter().any(|o| o == "*") => AllowOrigin::from(Any),
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
