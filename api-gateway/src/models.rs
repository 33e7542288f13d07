// ==============================================================================
// models.rs - Gateway Data Models
// ==============================================================================
// Description: Identity, auth service wire format and response models
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UpstreamError;

/// Caller role as reported by the auth service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Participant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Participant => "PARTICIPANT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller, built fresh from each verify reply.
///
/// Each variant holds exactly the attributes meaningful for its role: a user
/// has a numeric id, a participant has a UUID and is scoped to at most one
/// room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User {
        user_id: i64,
    },
    Participant {
        participant_id: Uuid,
        room_id: Option<i64>,
    },
}

impl Identity {
    pub fn role(&self) -> Role {
        match self {
            Identity::User { .. } => Role::User,
            Identity::Participant { .. } => Role::Participant,
        }
    }
}

/// Verify request body sent to the auth service
#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub token: &'a str,
}

/// Verify response body (HTTP 200) from the auth service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub role: Role,
    pub user_id: Option<i64>,
    pub participant_id: Option<Uuid>,
    pub room_id: Option<i64>,
}

impl TryFrom<VerifyResponse> for Identity {
    type Error = UpstreamError;

    /// Fields belonging to the other role are dropped; a missing field
    /// required by the declared role is a protocol violation.
    fn try_from(response: VerifyResponse) -> Result<Self, Self::Error> {
        match response.role {
            Role::User => {
                let user_id = response.user_id.ok_or_else(|| {
                    UpstreamError::ProtocolViolation("USER identity without userId".to_string())
                })?;
                Ok(Identity::User { user_id })
            }
            Role::Participant => {
                let participant_id = response.participant_id.ok_or_else(|| {
                    UpstreamError::ProtocolViolation(
                        "PARTICIPANT identity without participantId".to_string(),
                    )
                })?;
                Ok(Identity::Participant {
                    participant_id,
                    room_id: response.room_id,
                })
            }
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
