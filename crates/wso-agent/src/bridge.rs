// SPDX-License-Identifier: MIT

//! Idempotent Linux bridge setup (spec.md §4.5: "The bridge is configured
//! at agent startup (idempotent create of a Linux bridge with a default
//! `192.168.100.1/24`)").
//!
//! Shells out to `ip`: one small async helper wrapping
//! `tokio::process::Command`, tolerant of "already exists" so repeated
//! startup is a no-op.

use tracing::{debug, info, warn};

/// Ensure `name` exists as a Linux bridge with `cidr` assigned and is up.
/// Safe to call on every agent startup; a bridge that already exists with
/// the right address is left untouched.
pub async fn ensure_bridge(name: &str, cidr: &str) -> Result<(), BridgeError> {
    if !link_exists(name).await? {
        run_ip(&["link", "add", "name", name, "type", "bridge"]).await.map_err(BridgeError::Setup)?;
        info!(bridge = name, "created bridge device");
    } else {
        debug!(bridge = name, "bridge device already present");
    }

    if !address_assigned(name, cidr).await? {
        // "File exists" here just means a previous partial run already
        // assigned it; tolerate that case rather than failing startup.
        if let Err(e) = run_ip(&["addr", "add", cidr, "dev", name]).await {
            if !e.contains("File exists") {
                return Err(BridgeError::Setup(e));
            }
        }
    }

    run_ip(&["link", "set", name, "up"]).await.map_err(BridgeError::Setup)?;
    Ok(())
}

async fn link_exists(name: &str) -> Result<bool, BridgeError> {
    let output = tokio::process::Command::new("ip")
        .args(["link", "show", name])
        .output()
        .await
        .map_err(|e| BridgeError::Exec(e.to_string()))?;
    Ok(output.status.success())
}

async fn address_assigned(name: &str, cidr: &str) -> Result<bool, BridgeError> {
    let output = tokio::process::Command::new("ip")
        .args(["addr", "show", name])
        .output()
        .await
        .map_err(|e| BridgeError::Exec(e.to_string()))?;
    if !output.status.success() {
        return Ok(false);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.contains(host_part(cidr)))
}

/// `"192.168.100.1/24"` -> `"192.168.100.1"`.
fn host_part(cidr: &str) -> &str {
    cidr.split('/').next().unwrap_or(cidr)
}

async fn run_ip(args: &[&str]) -> Result<String, String> {
    let output = tokio::process::Command::new("ip")
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to exec ip: {e}"))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(args = ?args, stderr = %stderr, "ip command failed");
        Err(stderr.trim().to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to execute ip: {0}")]
    Exec(String),
    #[error("bridge setup failed: {0}")]
    Setup(String),
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
