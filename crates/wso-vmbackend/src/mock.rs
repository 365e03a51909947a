// SPDX-License-Identifier: MIT

//! In-memory `VmBackend` for coordinator unit tests.

use crate::port::{vm_name, VmBackend, VmConfig, VmInstance, VmStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wso_core::{CoreError, WorkshopId};

/// Mock adapter. Deterministic naming, in-memory state, and a few knobs to
/// make provisioning fail or stall so the coordinator's failure paths can be
/// exercised without a real cloud.
#[derive(Clone, Default)]
pub struct MockVmBackend {
    vms: Arc<Mutex<HashMap<String, VmInstance>>>,
    fail_create: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
    create_calls: Arc<Mutex<Vec<WorkshopId>>>,
}

impl MockVmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause the next (and all subsequent) `create_vm` calls to fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Cause the next (and all subsequent) `delete_vm` calls to fail.
    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_vm` calls made for the given workshop so far —
    /// used to assert spec.md §8 invariant 2 (no concurrent duplicate
    /// provisioning).
    pub fn create_call_count(&self, workshop_id: &WorkshopId) -> usize {
        self.create_calls.lock().iter().filter(|id| *id == workshop_id).count()
    }
}

#[async_trait]
impl VmBackend for MockVmBackend {
    async fn create_vm(&self, cfg: &VmConfig) -> Result<VmInstance, CoreError> {
        self.create_calls.lock().push(cfg.workshop_id);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(CoreError::UpstreamUnavailable("mock: create_vm forced failure".into()));
        }
        let name = vm_name(&cfg.workshop_id);
        let instance = VmInstance {
            id: format!("mock-{name}"),
            name: name.clone(),
            external_ip: Some("203.0.113.10".to_string()),
            internal_ip: Some("10.0.0.10".to_string()),
            status: VmStatus::Running,
            zone: cfg.zone.clone(),
        };
        self.vms.lock().insert(cfg.workshop_id.to_string(), instance.clone());
        Ok(instance)
    }

    async fn delete_vm(&self, workshop_id: &WorkshopId) -> Result<(), CoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CoreError::UpstreamUnavailable("mock: delete_vm forced failure".into()));
        }
        self.vms.lock().remove(workshop_id.as_str());
        Ok(())
    }

    async fn get_vm(&self, workshop_id: &WorkshopId) -> Result<Option<VmInstance>, CoreError> {
        Ok(self.vms.lock().get(workshop_id.as_str()).cloned())
    }

    async fn wait_for_ready(&self, workshop_id: &WorkshopId, _timeout: Duration) -> Result<VmInstance, CoreError> {
        self.get_vm(workshop_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("vm for workshop {workshop_id}")))
    }

    async fn list_vms(&self, workshop_id: Option<&WorkshopId>) -> Result<Vec<VmInstance>, CoreError> {
        let vms = self.vms.lock();
        Ok(match workshop_id {
            Some(id) => vms.get(id.as_str()).cloned().into_iter().collect(),
            None => vms.values().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::VmConfig;
    use wso_core::RuntimeType;

    fn cfg(workshop_id: WorkshopId) -> VmConfig {
        VmConfig {
            workshop_id,
            seats: 3,
            machine_type: "e2-standard-4".into(),
            disk_gb: 50,
            use_spot: false,
            zone: "us-central1-a".into(),
            ssh_public_key: "ssh-ed25519 AAAA".into(),
            runtime_type: RuntimeType::Docker,
            worker_agent_token: "tok".into(),
            backend_url: "https://cp.example".into(),
            workspace_token_secret: "secret".into(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let backend = MockVmBackend::new();
        let wid = WorkshopId::new();
        let created = backend.create_vm(&cfg(wid)).await.unwrap();
        let fetched = backend.get_vm(&wid).await.unwrap().unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let backend = MockVmBackend::new();
        let wid = WorkshopId::new();
        backend.create_vm(&cfg(wid)).await.unwrap();
        backend.delete_vm(&wid).await.unwrap();
        assert!(backend.get_vm(&wid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn forced_failure_surfaces_upstream_unavailable() {
        let backend = MockVmBackend::new();
        backend.set_fail_create(true);
        let err = backend.create_vm(&cfg(WorkshopId::new())).await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn forced_delete_failure_surfaces_upstream_unavailable() {
        let backend = MockVmBackend::new();
        let wid = WorkshopId::new();
        backend.create_vm(&cfg(wid)).await.unwrap();
        backend.set_fail_delete(true);
        let err = backend.delete_vm(&wid).await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn repeated_create_targets_same_name() {
        let backend = MockVmBackend::new();
        let wid = WorkshopId::new();
        let first = backend.create_vm(&cfg(wid)).await.unwrap();
        let second = backend.create_vm(&cfg(wid)).await.unwrap();
        assert_eq!(first.name, second.name);
    }
}
