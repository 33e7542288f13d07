// ==============================================================================
// router.rs - Authenticating Request Router
// ==============================================================================
// Description: Per-request classify -> validate -> enrich pipeline
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Classifying
//   -> Public:  build outbound request (identity headers stripped), forward
//   -> Private: extract credential -> validate -> enrich -> forward
//   -> NotFound
//
// A rejected request never produces an OutboundRequest, so nothing reaches a
// downstream service. The body is only read once the request is cleared to
// go, and validation is never skipped or retried.
//
// ==============================================================================

use std::sync::Arc;

use axum::{body::Body, extract::Request};
use http_body_util::LengthLimitError;
use tracing::{debug, warn};

use crate::auth_client::TokenValidator;
use crate::config::ServiceUrls;
use crate::error::{ClientError, GatewayError, UpstreamError};
use crate::middleware::BearerCredential;
use crate::models::Identity;
use crate::routing::{PathClassifier, RouteDecision};
use crate::upstream::OutboundRequest;

pub struct RequestRouter {
    classifier: PathClassifier,
    services: ServiceUrls,
    validator: Arc<dyn TokenValidator>,
    max_body_bytes: usize,
}

impl RequestRouter {
    pub fn new(
        classifier: PathClassifier,
        services: ServiceUrls,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        Self {
            classifier,
            services,
            validator,
            max_body_bytes: usize::MAX,
        }
    }

    /// Reject bodies longer than `limit` bytes with 413
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    /// Turn an inbound request into the request to dispatch downstream
    pub async fn prepare(&self, request: Request) -> Result<OutboundRequest, GatewayError> {
        let (parts, body) = request.into_parts();

        let (service, identity) = match self.classifier.classify(parts.uri.path()) {
            RouteDecision::NotFound => return Err(ClientError::NotFound.into()),
            RouteDecision::Public(service) => (service, None),
            RouteDecision::Private(service) => {
                let credential = BearerCredential::from_headers(&parts.headers)
                    .ok_or(ClientError::MissingCredential)?;
                let identity = self.authenticate(&credential).await?;
                (service, Some(identity))
            }
        };

        let mut outbound =
            OutboundRequest::from_parts(service, self.services.base_url(service), &parts);
        if let Some(identity) = &identity {
            outbound = outbound.with_identity(identity)?;
        }

        let body = read_body(body, self.max_body_bytes).await?;
        Ok(outbound.with_body(body))
    }

    async fn authenticate(&self, credential: &BearerCredential) -> Result<Identity, GatewayError> {
        match self.validator.validate(credential.as_str()).await {
            Ok(identity) => {
                debug!(role = %identity.role(), "Credential validated");
                Ok(identity)
            }
            Err(failure) => {
                let err = GatewayError::from(failure);
                log_auth_failure(&err);
                Err(err)
            }
        }
    }
}

async fn read_body(body: Body, limit: usize) -> Result<axum::body::Bytes, GatewayError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_length_limit(&e) {
            GatewayError::from(ClientError::PayloadTooLarge { limit })
        } else {
            GatewayError::from(ClientError::UnreadableBody(e.to_string()))
        }
    })
}

/// The limit may trip here or in the body limit layer, which nests the
/// error one level deeper
fn exceeds_length_limit(err: &axum::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

fn log_auth_failure(err: &GatewayError) {
    match err {
        GatewayError::Upstream(UpstreamError::Timeout(timeout)) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Auth service timed out");
        }
        GatewayError::Upstream(UpstreamError::ProtocolViolation(reason)) => {
            warn!(reason = %reason, "Auth service broke the verify contract");
        }
        GatewayError::Upstream(upstream) => {
            warn!(error = %upstream, "Auth service unavailable");
        }
        other => debug!(error = %other, "Credential rejected"),
    }
}
