// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the worker agent binary
//! (spec.md §6 "Environment variables consumed by the agent").
//!
//! Startup resolves configuration from the process environment and, when a
//! key is absent there, falls back to cloud instance metadata via
//! [`crate::metadata`]. This module only covers the plain-env half of that
//! lookup; `metadata::resolve` layers the instance-metadata fallback on top
//! of the functions here where the spec calls for it (`agent-token`,
//! `workshop-id`, `backend-url`, `workspace-token-secret`).

/// Protocol version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP listen port. Default `9090` (spec.md §6, §4.7 tunnel local port).
pub fn port() -> u16 {
    std::env::var("PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(9090)
}

/// Bearer token `/vms/*` and `/info` require. Empty disables auth (dev mode,
/// spec.md §4.4).
pub fn agent_token() -> String {
    std::env::var("AGENT_TOKEN").unwrap_or_default()
}

pub fn worker_id() -> Option<String> {
    std::env::var("WORKER_ID").ok().filter(|s| !s.is_empty())
}

/// MicroVM pool capacity. Default `50` (spec.md §4.4).
pub fn capacity() -> usize {
    std::env::var("CAPACITY").ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(50)
}

/// Linux bridge device name. Default `wsobr0`.
pub fn bridge_name() -> String {
    std::env::var("BRIDGE_NAME").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "wsobr0".into())
}

/// Bridge address in CIDR form. Default `192.168.100.1/24` (spec.md §6).
pub fn bridge_ip() -> String {
    std::env::var("BRIDGE_IP").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "192.168.100.1/24".into())
}

pub fn images_dir() -> std::path::PathBuf {
    std::env::var("IMAGES_DIR").map(std::path::PathBuf::from).unwrap_or_else(|_| std::path::PathBuf::from("/var/lib/wso/images"))
}

pub fn socket_dir() -> std::path::PathBuf {
    std::env::var("SOCKET_DIR").map(std::path::PathBuf::from).unwrap_or_else(|_| std::path::PathBuf::from("/var/lib/wso/sockets"))
}

/// Disables the tunnel manager and allows agent startup without a CP
/// backend URL reachable (spec.md §4.7 step 1).
pub fn dev_mode() -> bool {
    std::env::var("DEV_MODE").map(|v| v == "true" || v == "1").unwrap_or(false)
}

/// External tunneling binary invoked by the tunnel manager (spec.md §4.7
/// step 2). Defaults to `cloudflared`'s quick-tunnel mode, which publishes
/// `https://<slug>.trycloudflare.com` for a local port with no account
/// setup, matching [`tunnel_host`].
pub fn tunnel_bin() -> String {
    std::env::var("TUNNEL_BIN").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "cloudflared".into())
}

/// Hostname suffix the tunnel URL capture regex matches against (spec.md
/// §4.7 step 3: `https://[a-z0-9-]+\.<tunnel-host>`).
pub fn tunnel_host() -> String {
    std::env::var("TUNNEL_HOST").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "trycloudflare.com".into())
}

/// Graceful-shutdown drain timeout for in-flight proxy sessions
/// (SPEC_FULL.md §4.4 addition).
pub fn drain_timeout() -> std::time::Duration {
    std::env::var("DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(std::time::Duration::from_millis)
        .unwrap_or(std::time::Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
