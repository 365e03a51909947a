// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the control plane binary.

/// Protocol version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP listen port. Default `8080`.
pub fn port() -> u16 {
    std::env::var("PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(8080)
}

/// Postgres connection string. Required; the CP refuses to start without it.
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty())
}

pub fn gcp_project() -> Option<String> {
    std::env::var("GCP_PROJECT").ok().filter(|s| !s.is_empty())
}

pub fn gcp_zone() -> String {
    std::env::var("GCP_ZONE").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "us-central1-a".into())
}

pub fn gcp_registry() -> Option<String> {
    std::env::var("GCP_REGISTRY").ok().filter(|s| !s.is_empty())
}

pub fn fc_snapshot_name() -> Option<String> {
    std::env::var("FC_SNAPSHOT_NAME").ok().filter(|s| !s.is_empty())
}

pub fn fc_agent_token() -> Option<String> {
    std::env::var("FC_AGENT_TOKEN").ok().filter(|s| !s.is_empty())
}

/// URL the agent's tunnel manager registers its public URL against, i.e.
/// this CP's own externally-reachable base URL.
pub fn backend_url() -> String {
    std::env::var("BACKEND_URL").unwrap_or_default()
}

/// Secret used to sign short-lived seat access tokens (JWT).
pub fn workspace_token_secret() -> String {
    std::env::var("WORKSPACE_TOKEN_SECRET").unwrap_or_default()
}

/// Comma-separated list of allowed CORS origins; `*` permits any.
pub fn cors_origins() -> Vec<String> {
    std::env::var("CORS_ORIGINS")
        .ok()
        .map(|s| s.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
        .unwrap_or_default()
}

pub fn auth_disabled() -> bool {
    std::env::var("AUTH_DISABLED").map(|v| v == "true" || v == "1").unwrap_or(false)
}

pub fn gcp_use_spot() -> bool {
    std::env::var("GCP_USE_SPOT").map(|v| v == "true" || v == "1").unwrap_or(false)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
