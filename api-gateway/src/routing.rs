// ==============================================================================
// routing.rs - Path Classification
// ==============================================================================
// Description: Maps request paths to public/private upstream routes
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Rules, most specific first:
// - login endpoint            -> public, user service
// - /user, /room, /vote roots -> private, owning service
// - configured public prefix  -> public, configured service
// - anything else             -> not found (no network call)
//
// Prefixes match on segment boundaries: /room matches /room, /room/ and
// /room/42 but not /rooms.
//
// Paths with a "." or ".." segment (literal or %2e-encoded) are not found.
// The forwarding URL parser would resolve them, so the classified path and
// the forwarded path could name different routes.
//
// ==============================================================================

use std::borrow::Cow;
use std::str::FromStr;

use thiserror::Error;

/// Default public login endpoint
pub const DEFAULT_LOGIN_PATH: &str = "/user/login";

/// Upstream services behind the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    User,
    Room,
    Vote,
    Auth,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::User => "user",
            Service::Room => "room",
            Service::Vote => "vote",
            Service::Auth => "auth",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown service: {0}")]
pub struct UnknownService(pub String);

impl FromStr for Service {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Service::User),
            "room" => Ok(Service::Room),
            "vote" => Ok(Service::Vote),
            "auth" => Ok(Service::Auth),
            other => Err(UnknownService(other.to_string())),
        }
    }
}

/// Roots that always require a validated credential
const PRIVATE_ROOTS: [(&str, Service); 3] = [
    ("/user", Service::User),
    ("/room", Service::Room),
    ("/vote", Service::Vote),
];

/// A path prefix that bypasses authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPrefix {
    pub prefix: String,
    pub service: Service,
}

impl PublicPrefix {
    pub fn new(prefix: &str, service: Service) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            service,
        }
    }
}

/// Routing decision for one request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Forward without a credential
    Public(Service),
    /// Forward only after the credential validates
    Private(Service),
    /// No route; answer 404 without touching the network
    NotFound,
}

impl RouteDecision {
    pub fn requires_auth(&self) -> bool {
        matches!(self, RouteDecision::Private(_))
    }

    pub fn service(&self) -> Option<Service> {
        match self {
            RouteDecision::Public(service) | RouteDecision::Private(service) => Some(*service),
            RouteDecision::NotFound => None,
        }
    }
}

/// Pure path classifier; built once from configuration
#[derive(Debug, Clone)]
pub struct PathClassifier {
    login_path: String,
    public_prefixes: Vec<PublicPrefix>,
}

impl PathClassifier {
    pub fn new(login_path: &str, public_prefixes: Vec<PublicPrefix>) -> Self {
        Self {
            login_path: normalize_prefix(login_path),
            public_prefixes,
        }
    }

    pub fn classify(&self, path: &str) -> RouteDecision {
        let path = normalize_path(path);

        if has_dot_segment(&path) {
            return RouteDecision::NotFound;
        }

        if is_exact(&path, &self.login_path) {
            return RouteDecision::Public(Service::User);
        }

        for (root, service) in PRIVATE_ROOTS {
            if is_under(&path, root) {
                return RouteDecision::Private(service);
            }
        }

        self.public_prefixes
            .iter()
            .find(|public| is_under(&path, &public.prefix))
            .map(|public| RouteDecision::Public(public.service))
            .unwrap_or(RouteDecision::NotFound)
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_LOGIN_PATH,
            vec![PublicPrefix::new("/auth", Service::Auth)],
        )
    }
}

fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{}", path))
    }
}

/// Leading slash, no trailing slash ("/" becomes "")
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

fn is_exact(path: &str, target: &str) -> bool {
    path == target || path.strip_suffix('/') == Some(target)
}

fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
