// ==============================================================================
// middleware/identity.rs - Identity Header Enrichment
// ==============================================================================
// Description: Headers that carry the validated caller identity downstream
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Downstream services trust these headers instead of re-verifying the token,
// so every caller-supplied value for any of the four names is dropped before
// the enriched values are added.
//
// ==============================================================================

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::GatewayError;
use crate::models::Identity;

pub static X_ROLE: HeaderName = HeaderName::from_static("x-role");
pub static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub static X_PARTICIPANT_ID: HeaderName = HeaderName::from_static("x-participant-id");
pub static X_ROOM_ID: HeaderName = HeaderName::from_static("x-room-id");

/// All headers owned by the gateway
pub static IDENTITY_HEADERS: [&HeaderName; 4] =
    [&X_ROLE, &X_USER_ID, &X_PARTICIPANT_ID, &X_ROOM_ID];

/// Identity headers for the forwarded request, role marker first
pub fn enrich(identity: &Identity) -> Result<Vec<(HeaderName, HeaderValue)>, GatewayError> {
    let mut headers = vec![(X_ROLE.clone(), HeaderValue::from_static(identity.role().as_str()))];

    match identity {
        Identity::User { user_id } => {
            headers.push((X_USER_ID.clone(), HeaderValue::from(*user_id)));
        }
        Identity::Participant {
            participant_id,
            room_id,
        } => {
            let value = HeaderValue::from_str(&participant_id.to_string()).map_err(|e| {
                GatewayError::Internal(format!("participant id is not a header value: {}", e))
            })?;
            headers.push((X_PARTICIPANT_ID.clone(), value));

            if let Some(room_id) = room_id {
                headers.push((X_ROOM_ID.clone(), HeaderValue::from(*room_id)));
            }
        }
    }

    Ok(headers)
}

/// Remove every identity header a caller may have sent
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(name);
    }
}

/// Replace identity headers with the ones derived from `identity`
pub fn apply_identity_headers(
    headers: &mut HeaderMap,
    identity: &Identity,
) -> Result<(), GatewayError> {
    let enriched = enrich(identity)?;

    strip_identity_headers(headers);
    for (name, value) in enriched {
        headers.append(name, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn names(headers: &[(HeaderName, HeaderValue)]) -> Vec<&str> {
        headers.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn test_user_headers() {
        let headers = enrich(&Identity::User { user_id: 7 }).unwrap();

        assert_eq!(names(&headers), vec!["x-role", "x-user-id"]);
        assert_eq!(headers[0].1, "USER");
        assert_eq!(headers[1].1, "7");
    }

    #[test]
    fn test_participant_headers_with_room() {
        let participant_id = Uuid::new_v4();
        let headers = enrich(&Identity::Participant {
            participant_id,
            room_id: Some(1),
        })
        .unwrap();

        assert_eq!(
            names(&headers),
            vec!["x-role", "x-participant-id", "x-room-id"]
        );
        assert_eq!(headers[0].1, "PARTICIPANT");
        assert_eq!(headers[1].1, participant_id.to_string().as_str());
        assert_eq!(headers[2].1, "1");
    }

    #[test]
    fn test_participant_headers_without_room() {
        let headers = enrich(&Identity::Participant {
            participant_id: Uuid::new_v4(),
            room_id: None,
        })
        .unwrap();

        assert_eq!(names(&headers), vec!["x-role", "x-participant-id"]);
    }

    #[test]
    fn test_spoofed_headers_are_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("999"));
        headers.append(
            HeaderName::from_bytes(b"X-User-Id").unwrap(),
            HeaderValue::from_static("1000"),
        );
        headers.insert("x-role", HeaderValue::from_static("ADMIN"));
        headers.insert("x-participant-id", HeaderValue::from_static("spoofed"));
        headers.insert("x-room-id", HeaderValue::from_static("42"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        apply_identity_headers(&mut headers, &Identity::User { user_id: 1 }).unwrap();

        let user_ids: Vec<_> = headers.get_all(&X_USER_ID).iter().collect();
        assert_eq!(user_ids, vec!["1"]);
        assert_eq!(headers[&X_ROLE], "USER");
        assert!(headers.get(&X_PARTICIPANT_ID).is_none());
        assert!(headers.get(&X_ROOM_ID).is_none());
        assert_eq!(headers["x-request-id"], "abc");
    }
}
