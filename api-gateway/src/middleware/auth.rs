// ==============================================================================
// middleware/auth.rs - Bearer Credential Extraction
// ==============================================================================
// Description: Pull the raw bearer token out of the Authorization header
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Security: a missing, non-ASCII or blank Authorization value yields no
// credential, and the router rejects the request with 401 before the auth
// service is ever called.
//
// ==============================================================================

use axum::http::{header::AUTHORIZATION, HeaderMap};

const BEARER_SCHEME: &str = "bearer";

/// Raw bearer token, with any `Bearer ` scheme prefix removed
///
/// Both `Authorization: Bearer <token>` and a bare `Authorization: <token>`
/// are accepted; the scheme is matched case-insensitively. Only the first
/// `Authorization` value is considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerCredential(String);

impl BearerCredential {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
        let token = strip_scheme(raw);

        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn strip_scheme(raw: &str) -> &str {
    let scheme_len = BEARER_SCHEME.len();
    let has_scheme = raw
        .get(..scheme_len)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(BEARER_SCHEME));

    if !has_scheme {
        return raw;
    }

    let rest = &raw[scheme_len..];
    if rest.is_empty() {
        // "Bearer" with nothing after it
        ""
    } else if rest.starts_with(char::is_whitespace) {
        rest.trim()
    } else {
        // e.g. "Bearertoken": not a scheme, treat the whole value as the token
        raw
    }
}
