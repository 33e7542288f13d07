// ==============================================================================
// config.rs - Gateway Configuration
// ==============================================================================
// Description: Service URLs, public prefixes and timeouts from environment
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Read once at startup and never mutated afterwards.
//
// ==============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::routing::{PathClassifier, PublicPrefix, Service, DEFAULT_LOGIN_PATH};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_VERIFY_PATH: &str = "/api/auth/verify";
const DEFAULT_AUTH_TIMEOUT_MS: u64 = 3000;
const DEFAULT_FORWARD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PUBLIC_PREFIXES: &str = "/auth=auth";
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024; // 10 MB

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Base URLs of the services behind the gateway (no trailing slash)
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    pub user: String,
    pub room: String,
    pub vote: String,
    pub auth: String,
}

impl ServiceUrls {
    pub fn base_url(&self, service: Service) -> &str {
        match service {
            Service::User => &self.user,
            Service::Room => &self.room,
            Service::Vote => &self.vote,
            Service::Auth => &self.auth,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub services: ServiceUrls,
    pub auth_verify_path: String,
    pub auth_timeout: Duration,
    pub forward_timeout: Duration,
    pub login_path: String,
    pub public_prefixes: Vec<PublicPrefix>,
    pub max_body_bytes: usize,
    /// `None` allows any origin
    pub cors_allowed_origins: Option<Vec<String>>,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let services = ServiceUrls {
            user: base_url(&lookup, "USER_SERVICE_URL")?,
            room: base_url(&lookup, "ROOM_SERVICE_URL")?,
            vote: base_url(&lookup, "VOTE_SERVICE_URL")?,
            auth: base_url(&lookup, "AUTH_SERVICE_URL")?,
        };

        let auth_timeout_ms: u64 = parse_or(&lookup, "AUTH_TIMEOUT_MS", DEFAULT_AUTH_TIMEOUT_MS)?;
        if auth_timeout_ms == 0 {
            anyhow::bail!("AUTH_TIMEOUT_MS must be greater than zero");
        }

        let public_prefixes = parse_public_prefixes(
            &lookup("PUBLIC_PATH_PREFIXES").unwrap_or_else(|| DEFAULT_PUBLIC_PREFIXES.to_string()),
        )?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("compact") => LogFormat::Compact,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'compact' or 'json', got '{}'", other),
        };

        Ok(Self {
            port: parse_or(&lookup, "GATEWAY_PORT", DEFAULT_PORT)?,
            services,
            auth_verify_path: lookup("AUTH_VERIFY_PATH")
                .unwrap_or_else(|| DEFAULT_VERIFY_PATH.to_string()),
            auth_timeout: Duration::from_millis(auth_timeout_ms),
            forward_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FORWARD_TIMEOUT_SECS",
                DEFAULT_FORWARD_TIMEOUT_SECS,
            )?),
            login_path: lookup("LOGIN_PATH").unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            public_prefixes,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            cors_allowed_origins,
            log_format,
        })
    }

    /// Full URL of the auth service verify endpoint
    pub fn verify_url(&self) -> String {
        let path = self.auth_verify_path.trim();
        if path.starts_with('/') {
            format!("{}{}", self.services.auth, path)
        } else {
            format!("{}/{}", self.services.auth, path)
        }
    }

    pub fn classifier(&self) -> PathClassifier {
        PathClassifier::new(&self.login_path, self.public_prefixes.clone())
    }
}

fn base_url<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).with_context(|| format!("{} must be set", key))?;
    let trimmed = raw.trim().trim_end_matches('/');

    let url = Url::parse(trimmed).with_context(|| format!("{} is not a valid URL", key))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("{} must use http or https, got '{}'", key, url.scheme());
    }

    Ok(trimmed.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}

/// Parse `prefix[=service]` entries separated by commas
fn parse_public_prefixes(raw: &str) -> Result<Vec<PublicPrefix>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<PublicPrefix> {
            let (prefix, service) = match entry.split_once('=') {
                Some((prefix, service)) => (
                    prefix,
                    service
                        .parse::<Service>()
                        .with_context(|| format!("invalid public prefix entry '{}'", entry))?,
                ),
                None => (entry, Service::Auth),
            };
            Ok(PublicPrefix::new(prefix, service))
        })
        .collect()
}
