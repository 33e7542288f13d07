// ==============================================================================
// middleware/mod.rs - Gateway Request Middleware
// ==============================================================================
// Description: Credential extraction and identity header enrichment
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod auth;
pub mod identity;

pub use auth::BearerCredential;
pub use identity::{apply_identity_headers, enrich, strip_identity_headers, IDENTITY_HEADERS};
