// SPDX-License-Identifier: MIT

//! Startup configuration: environment first, cloud instance metadata second
//! (spec.md §4.4 "Startup reads configuration from environment and, when
//! absent, from cloud instance metadata").
//!
//! The metadata server shape mirrors [`wso_vmbackend::cloud::metadata_keys`]
//! on the CP side: the booting worker host reads back exactly what
//! `CloudVmBackend::create_vm` injected.

use std::time::Duration;

const METADATA_BASE: &str = "http://metadata.internal/computeMetadata/v1/instance/attributes";

/// Resolved startup configuration (spec.md §4.4, §6 instance metadata keys).
#[derive(Debug, Clone, Default)]
pub struct AgentMetadata {
    pub agent_token: String,
    pub workshop_id: Option<String>,
    pub backend_url: Option<String>,
    pub workspace_token_secret: String,
    pub name: Option<String>,
}

/// Resolve each key from the environment, falling back to the instance
/// metadata server when the environment variable is unset. A metadata
/// server that is unreachable (e.g. running outside the cloud) is treated
/// as "no value", not an error — callers apply their own defaults.
pub async fn resolve(client: &reqwest::Client) -> AgentMetadata {
    AgentMetadata {
        agent_token: env_or_metadata(client, "AGENT_TOKEN", "agent-token").await.unwrap_or_default(),
        workshop_id: env_or_metadata(client, "WORKSHOP_ID", "workshop-id").await,
        backend_url: env_or_metadata(client, "BACKEND_URL", "backend-url").await,
        workspace_token_secret: env_or_metadata(client, "WORKSPACE_TOKEN_SECRET", "workspace-token-secret")
            .await
            .unwrap_or_default(),
        name: env_or_metadata(client, "WORKER_ID", "name").await,
    }
}

async fn env_or_metadata(client: &reqwest::Client, env_key: &str, metadata_key: &str) -> Option<String> {
    if let Ok(v) = std::env::var(env_key) {
        if !v.is_empty() {
            return Some(v);
        }
    }
    fetch_metadata(client, metadata_key).await
}

async fn fetch_metadata(client: &reqwest::Client, key: &str) -> Option<String> {
    let url = format!("{METADATA_BASE}/{key}");
    let resp = tokio::time::timeout(
        Duration::from_secs(2),
        client.get(&url).header("Metadata-Flavor", "Google").send(),
    )
    .await
    .ok()?
    .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.text().await.ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
