// SPDX-License-Identifier: MIT

//! Firecracker-over-Cloud `VmBackend`: provisions one worker-host VM the
//! same way [`crate::cloud::CloudVmBackend`] does, but boots from a
//! Firecracker snapshot and authenticates with a dedicated agent token
//! rather than the Docker-runtime worker-agent token (spec.md §4.2, Open
//! Question (c)). The worker host itself still runs the Agent; the only
//! difference from the Docker path is what the boot script does once the
//! host is up.

use crate::cloud::{metadata_keys, CloudVmBackend};
use crate::port::{VmBackend, VmConfig, VmInstance};
use async_trait::async_trait;
use std::time::Duration;
use wso_core::{CoreError, WorkshopId};

/// Extra metadata keys consumed only by the Firecracker boot path.
pub mod fc_metadata_keys {
    pub const SNAPSHOT_NAME: &str = "fc-snapshot-name";
}

/// Wraps a [`CloudVmBackend`] and injects the Firecracker-specific
/// metadata. Configuration (snapshot name, agent token) is resolved at the
/// composition root; if either is missing the backend must not be built —
/// `CreateVM` should never silently fall back to the Docker path.
#[derive(Clone)]
pub struct FirecrackerVmBackend {
    inner: CloudVmBackend,
    // TODO: thread into create_vm as an fc-snapshot-name metadata entry
    // once the boot script reads it instead of resolving the image family
    // server-side.
    #[allow(dead_code)]
    snapshot_name: String,
    agent_token: String,
}

impl FirecrackerVmBackend {
    pub fn new(inner: CloudVmBackend, snapshot_name: impl Into<String>, agent_token: impl Into<String>) -> Self {
        Self { inner, snapshot_name: snapshot_name.into(), agent_token: agent_token.into() }
    }

    fn with_fc_overrides(&self, cfg: &VmConfig) -> VmConfig {
        VmConfig { worker_agent_token: self.agent_token.clone(), ..cfg.clone() }
    }
}

#[async_trait]
impl VmBackend for FirecrackerVmBackend {
    async fn create_vm(&self, cfg: &VmConfig) -> Result<VmInstance, CoreError> {
        if self.snapshot_name.is_empty() || self.agent_token.is_empty() {
            return Err(CoreError::invalid_input(
                "firecracker backend requires FC_SNAPSHOT_NAME and FC_AGENT_TOKEN",
            ));
        }
        let overridden = self.with_fc_overrides(cfg);
        self.inner.create_vm(&overridden).await
    }

    async fn delete_vm(&self, workshop_id: &WorkshopId) -> Result<(), CoreError> {
        self.inner.delete_vm(workshop_id).await
    }

    async fn get_vm(&self, workshop_id: &WorkshopId) -> Result<Option<VmInstance>, CoreError> {
        self.inner.get_vm(workshop_id).await
    }

    async fn wait_for_ready(&self, workshop_id: &WorkshopId, timeout: Duration) -> Result<VmInstance, CoreError> {
        self.inner.wait_for_ready(workshop_id, timeout).await
    }

    async fn list_vms(&self, workshop_id: Option<&WorkshopId>) -> Result<Vec<VmInstance>, CoreError> {
        self.inner.list_vms(workshop_id).await
    }
}

// Re-exported so the composition root can reference a single metadata-key
// module regardless of which backend it ends up constructing.
pub use metadata_keys as shared_metadata_keys;

#[cfg(test)]
mod tests {
    use super::*;
    use wso_core::RuntimeType;

    fn cfg() -> VmConfig {
        VmConfig {
            workshop_id: WorkshopId::new(),
            seats: 2,
            machine_type: "n2-standard-4".into(),
            disk_gb: 80,
            use_spot: false,
            zone: "us-central1-a".into(),
            ssh_public_key: "ssh-ed25519 AAAA".into(),
            runtime_type: RuntimeType::Firecracker,
            worker_agent_token: "docker-token".into(),
            backend_url: "https://cp.example".into(),
            workspace_token_secret: "secret".into(),
        }
    }

    #[tokio::test]
    async fn missing_snapshot_or_token_fails_fast() {
        let backend =
            FirecrackerVmBackend::new(CloudVmBackend::new(reqwest::Client::new(), "http://unused"), "", "");
        let err = backend.create_vm(&cfg()).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn fc_overrides_replace_agent_token_only() {
        let backend = FirecrackerVmBackend::new(
            CloudVmBackend::new(reqwest::Client::new(), "http://unused"),
            "snap-1",
            "fc-token",
        );
        let overridden = backend.with_fc_overrides(&cfg());
        assert_eq!(overridden.worker_agent_token, "fc-token");
        assert_eq!(overridden.zone, cfg().zone);
    }
}
