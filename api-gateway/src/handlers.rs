// ==============================================================================
// handlers.rs - API Request Handlers
// ==============================================================================
// Description: Health endpoint and the catch-all authenticating proxy
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::{error::Outcome, models::HealthResponse, state::AppState};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Fallback handler: every non-health request passes through the router
pub async fn proxy_request(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let outbound = match state.router().prepare(request).await {
        Ok(outbound) => outbound,
        Err(e) => {
            let outcome = e.outcome();
            match outcome {
                Outcome::RejectedUpstreamError | Outcome::InternalError => {
                    warn!(method = %method, path = %path, outcome = outcome.as_str(), error = %e, "Request rejected");
                }
                _ => {
                    info!(method = %method, path = %path, outcome = outcome.as_str(), "Request rejected");
                }
            }
            return e.into_response();
        }
    };

    let service = outbound.service;
    match state.upstream().dispatch(outbound).await {
        Ok(response) => {
            info!(
                method = %method,
                path = %path,
                service = %service,
                status = response.status().as_u16(),
                outcome = Outcome::Forwarded.as_str(),
                "Request forwarded"
            );
            response
        }
        Err(e) => {
            warn!(
                method = %method,
                path = %path,
                service = %service,
                outcome = e.outcome().as_str(),
                error = %e,
                "Request dispatch failed"
            );
            e.into_response()
        }
    }
}
