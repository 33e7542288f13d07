// ==============================================================================
// auth_client.rs - Token Validation Against the Auth Service
// ==============================================================================
// Description: Single bounded verify call and reply classification
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Reply mapping:
// - 200            -> Identity (role-required fields must be present)
// - 401            -> Unauthorized
// - 403            -> Forbidden
// - anything else  -> UpstreamUnavailable
// - transport error, malformed body, timeout -> UpstreamUnavailable
//
// Each call is at-most-once. Retries, if wanted, belong to a wrapper around
// the validator, not here.
//
// ==============================================================================

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use tracing::debug;

use crate::error::{ClientError, GatewayError, UpstreamError, UpstreamReply};
use crate::models::{Identity, VerifyRequest, VerifyResponse};

/// Classified validation failure
#[derive(Debug)]
pub enum AuthFailure {
    Unauthorized(Option<UpstreamReply>),
    Forbidden(Option<UpstreamReply>),
    UpstreamUnavailable(UpstreamError),
}

impl From<AuthFailure> for GatewayError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Unauthorized(reply) => ClientError::Unauthorized(reply).into(),
            AuthFailure::Forbidden(reply) => ClientError::Forbidden(reply).into(),
            AuthFailure::UpstreamUnavailable(err) => err.into(),
        }
    }
}

/// Validates a bearer credential and yields the caller's identity
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `credential` is the raw token without any `Bearer ` prefix; callers
    /// never pass an empty value.
    async fn validate(&self, credential: &str) -> Result<Identity, AuthFailure>;
}

/// Validator backed by the auth service's HTTP verify endpoint
pub struct HttpTokenValidator {
    client: reqwest::Client,
    verify_url: String,
    timeout: Duration,
}

impl HttpTokenValidator {
    pub fn new(verify_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self::with_client(client, verify_url, timeout))
    }

    pub fn with_client(
        client: reqwest::Client,
        verify_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            verify_url: verify_url.into(),
            timeout,
        }
    }

    async fn call(&self, credential: &str) -> Result<UpstreamReply, UpstreamError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&VerifyRequest { token: credential })
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Unreachable(format!("failed to read verify reply: {}", e)))?;

        Ok(UpstreamReply {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, credential: &str) -> Result<Identity, AuthFailure> {
        debug!(verify_url = %self.verify_url, "Verifying credential with auth service");

        // Dropping this future (caller gone) drops the in-flight request.
        let reply = match tokio::time::timeout(self.timeout, self.call(credential)).await {
            Ok(result) => result.map_err(AuthFailure::UpstreamUnavailable)?,
            Err(_) => {
                return Err(AuthFailure::UpstreamUnavailable(UpstreamError::Timeout(
                    self.timeout,
                )))
            }
        };

        debug!(status = %reply.status, "Auth service replied");
        interpret_reply(reply)
    }
}

/// Map a verify reply onto an identity or a classified failure
pub fn interpret_reply(reply: UpstreamReply) -> Result<Identity, AuthFailure> {
    match reply.status {
        StatusCode::OK => {
            let response: VerifyResponse = serde_json::from_slice(&reply.body).map_err(|e| {
                AuthFailure::UpstreamUnavailable(UpstreamError::ProtocolViolation(format!(
                    "malformed verify response: {}",
                    e
                )))
            })?;
            Identity::try_from(response).map_err(AuthFailure::UpstreamUnavailable)
        }
        StatusCode::UNAUTHORIZED => Err(AuthFailure::Unauthorized(reply.into_relay())),
        StatusCode::FORBIDDEN => Err(AuthFailure::Forbidden(reply.into_relay())),
        _ => Err(AuthFailure::UpstreamUnavailable(
            UpstreamError::UnexpectedStatus(reply),
        )),
    }
}
