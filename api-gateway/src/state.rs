// ==============================================================================
// state.rs - Application State Management
// ==============================================================================
// Description: Shared application state for the auth gateway
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::auth_client::{HttpTokenValidator, TokenValidator};
use crate::config::GatewayConfig;
use crate::router::RequestRouter;
use crate::upstream::UpstreamClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Classify -> validate -> enrich pipeline
    router: RequestRouter,

    /// Client used to forward requests downstream
    upstream: UpstreamClient,

    config: GatewayConfig,
}

impl AppState {
    /// Create application state backed by the HTTP auth service
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let validator = HttpTokenValidator::new(config.verify_url(), config.auth_timeout)
            .context("Failed to create auth service client")?;

        Self::with_validator(config, Arc::new(validator))
    }

    /// Create application state with a caller-supplied token validator
    pub fn with_validator(
        config: GatewayConfig,
        validator: Arc<dyn TokenValidator>,
    ) -> Result<Self> {
        let upstream = UpstreamClient::new(config.forward_timeout)
            .context("Failed to create upstream HTTP client")?;

        let router = RequestRouter::new(config.classifier(), config.services.clone(), validator)
            .with_body_limit(config.max_body_bytes);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                router,
                upstream,
                config,
            }),
        })
    }

    /// Get request router
    pub fn router(&self) -> &RequestRouter {
        &self.inner.router
    }

    /// Get upstream client
    pub fn upstream(&self) -> &UpstreamClient {
        &self.inner.upstream
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }
}
