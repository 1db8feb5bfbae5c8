//! Provider-facing configuration (data) for Keycloak-style realms.
//!
//! `config` exposes the validated [`ProviderConfig`] covering client credentials, the
//! callback URL, realm-templated endpoints (HTTPS-only outside loopback hosts), requested
//! scopes, state-cookie attributes, email policy, and provider quirks (access-denied
//! sentinels, scope delimiter).

pub mod config;

pub use config::*;
