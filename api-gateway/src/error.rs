// ==============================================================================
// error.rs - Gateway Error Taxonomy
// ==============================================================================
// Description: Client/upstream error classes and their HTTP responses
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Every rejection is resolved here into exactly one HTTP response. Failures
// of the auth service share a single caller-visible status (503); the variant
// only matters for logs.
//
// ==============================================================================

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;
use crate::routing::Service;
use crate::upstream::is_hop_by_hop;

/// Reply captured from the auth service so it can be relayed verbatim
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamReply {
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Keep the reply only if there is a body worth relaying
    pub fn into_relay(self) -> Option<Self> {
        self.has_body().then_some(self)
    }

    /// Relay headers and body under the given status
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in self.headers.iter() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        response
    }
}

/// Errors caused by the caller's request or credential
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing bearer credential")]
    MissingCredential,

    #[error("credential rejected by auth service")]
    Unauthorized(Option<UpstreamReply>),

    #[error("credential not authorized")]
    Forbidden(Option<UpstreamReply>),

    #[error("no route for path")]
    NotFound,

    #[error("failed to read request body: {0}")]
    UnreadableBody(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

/// Failures talking to the auth service
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("auth service unreachable: {0}")]
    Unreachable(String),

    #[error("auth service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("auth service protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("auth service answered with unexpected status {}", .0.status)]
    UnexpectedStatus(UpstreamReply),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("dispatch to {service} service failed: {reason}")]
    Dispatch { service: Service, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Terminal state of a single routed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Forwarded,
    RejectedUnauthorized,
    RejectedForbidden,
    RejectedUpstreamError,
    RejectedNotFound,
    RejectedBadRequest,
    DispatchFailed,
    InternalError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Forwarded => "forwarded",
            Outcome::RejectedUnauthorized => "rejected_unauthorized",
            Outcome::RejectedForbidden => "rejected_forbidden",
            Outcome::RejectedUpstreamError => "rejected_upstream_error",
            Outcome::RejectedNotFound => "rejected_not_found",
            Outcome::RejectedBadRequest => "rejected_bad_request",
            Outcome::DispatchFailed => "dispatch_failed",
            Outcome::InternalError => "internal_error",
        }
    }
}

impl GatewayError {
    pub fn outcome(&self) -> Outcome {
        match self {
            GatewayError::Client(ClientError::MissingCredential)
            | GatewayError::Client(ClientError::Unauthorized(_)) => Outcome::RejectedUnauthorized,
            GatewayError::Client(ClientError::Forbidden(_)) => Outcome::RejectedForbidden,
            GatewayError::Client(ClientError::NotFound) => Outcome::RejectedNotFound,
            GatewayError::Client(ClientError::UnreadableBody(_))
            | GatewayError::Client(ClientError::PayloadTooLarge { .. }) => Outcome::RejectedBadRequest,
            GatewayError::Upstream(_) => Outcome::RejectedUpstreamError,
            GatewayError::Dispatch { .. } => Outcome::DispatchFailed,
            GatewayError::Internal(_) => Outcome::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Client(ClientError::MissingCredential)
            | GatewayError::Client(ClientError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            GatewayError::Client(ClientError::Forbidden(_)) => StatusCode::FORBIDDEN,
            GatewayError::Client(ClientError::NotFound) => StatusCode::NOT_FOUND,
            GatewayError::Client(ClientError::UnreadableBody(_)) => StatusCode::BAD_REQUEST,
            GatewayError::Client(ClientError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Dispatch { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn relay_or_status(status: StatusCode, reply: Option<UpstreamReply>) -> Response {
    match reply {
        Some(reply) => reply.into_response_with_status(status),
        None => status.into_response(),
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GatewayError::Client(ClientError::MissingCredential) => status.into_response(),
            GatewayError::Client(ClientError::Unauthorized(reply))
            | GatewayError::Client(ClientError::Forbidden(reply)) => relay_or_status(status, reply),
            GatewayError::Client(ClientError::NotFound) => {
                (status, Json(ErrorResponse::new("Resource not found"))).into_response()
            }
            GatewayError::Client(ClientError::PayloadTooLarge { limit }) => (
                status,
                Json(ErrorResponse::with_details(
                    "Payload too large",
                    format!("limit is {} bytes", limit),
                )),
            )
                .into_response(),
            GatewayError::Client(ClientError::UnreadableBody(msg)) => (
                status,
                Json(ErrorResponse::with_details("Invalid request body", msg)),
            )
                .into_response(),
            GatewayError::Upstream(UpstreamError::UnexpectedStatus(reply)) if reply.has_body() => {
                reply.into_response_with_status(status)
            }
            GatewayError::Upstream(_) => (
                status,
                Json(ErrorResponse::new("Authentication service unavailable")),
            )
                .into_response(),
            GatewayError::Dispatch { .. } => (
                status,
                Json(ErrorResponse::new("Upstream service unavailable")),
            )
                .into_response(),
            GatewayError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (status, Json(ErrorResponse::new("Internal server error"))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn reply(status: StatusCode, body: &'static str) -> UpstreamReply {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-auth-reason", HeaderValue::from_static("expired"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        UpstreamReply {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_credential_is_status_only() {
        let response = GatewayError::from(ClientError::MissingCredential).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_relays_auth_reply_verbatim() {
        let relayed = reply(StatusCode::FORBIDDEN, r#"{"error":"Forbidden"}"#);
        let response = GatewayError::from(ClientError::Forbidden(Some(relayed))).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["x-auth-reason"], "expired");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().get(header::CONNECTION).is_none());
        assert_eq!(body_of(response).await, r#"{"error":"Forbidden"}"#);
    }

    #[test]
    fn test_empty_reply_is_not_relayed() {
        assert!(reply(StatusCode::UNAUTHORIZED, "").into_relay().is_none());
        assert!(reply(StatusCode::UNAUTHORIZED, "nope").into_relay().is_some());
    }

    #[tokio::test]
    async fn test_upstream_failures_share_one_status() {
        let errors = [
            GatewayError::from(UpstreamError::Unreachable("connection refused".into())),
            GatewayError::from(UpstreamError::Timeout(Duration::from_millis(50))),
            GatewayError::from(UpstreamError::ProtocolViolation("bad body".into())),
            GatewayError::from(UpstreamError::UnexpectedStatus(reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "",
            ))),
        ];

        for err in errors {
            assert_eq!(err.outcome(), Outcome::RejectedUpstreamError);
            assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[tokio::test]
    async fn test_unexpected_status_with_body_is_relayed() {
        let err = GatewayError::from(UpstreamError::UnexpectedStatus(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"db down"}"#,
        )));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()["x-auth-reason"], "expired");
        assert_eq!(body_of(response).await, r#"{"error":"db down"}"#);
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(
            GatewayError::from(ClientError::NotFound).outcome(),
            Outcome::RejectedNotFound
        );
        assert_eq!(
            GatewayError::from(ClientError::Forbidden(None)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::Dispatch {
                service: Service::Room,
                reason: "refused".into()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
