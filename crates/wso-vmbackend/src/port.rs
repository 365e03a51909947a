// SPDX-License-Identifier: MIT

//! `VMBackend` port: abstract cloud VM create/delete/get/wait/list
//! (spec.md §4.2). Adapters live in `cloud.rs`, `firecracker.rs`, and
//! `mock.rs`; the coordinator depends only on this trait.

use async_trait::async_trait;
use std::time::Duration;
use wso_core::{CoreError, RuntimeType, WorkshopId};

/// Observed status of a cloud VM instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    Provisioning,
    Running,
    Terminated,
    Unknown,
}

/// A handle to a worker host VM as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct VmInstance {
    pub id: String,
    pub name: String,
    pub external_ip: Option<String>,
    pub internal_ip: Option<String>,
    pub status: VmStatus,
    pub zone: String,
}

/// Labels the backend attaches to every VM it creates so `list_vms` can
/// enumerate by label filter (spec.md §4.2).
pub const LABEL_SYSTEM: &str = "workshop-orchestrator";

/// Configuration for a single worker-host VM (spec.md §4.1 step 2).
#[derive(Debug, Clone)]
pub struct VmConfig {
    pub workshop_id: WorkshopId,
    pub seats: u32,
    pub machine_type: String,
    pub disk_gb: u32,
    pub use_spot: bool,
    pub zone: String,
    pub ssh_public_key: String,
    pub runtime_type: RuntimeType,
    /// Injected as instance metadata so the booting VM can self-configure
    /// (spec.md §4.1 step 2, §6 instance metadata keys).
    pub worker_agent_token: String,
    pub backend_url: String,
    pub workspace_token_secret: String,
}

/// Abstract cloud-compute port. Five operations, deterministic naming.
#[async_trait]
pub trait VmBackend: Send + Sync {
    async fn create_vm(&self, cfg: &VmConfig) -> Result<VmInstance, CoreError>;
    async fn delete_vm(&self, workshop_id: &WorkshopId) -> Result<(), CoreError>;
    async fn get_vm(&self, workshop_id: &WorkshopId) -> Result<Option<VmInstance>, CoreError>;
    async fn wait_for_ready(&self, workshop_id: &WorkshopId, timeout: Duration) -> Result<VmInstance, CoreError>;
    async fn list_vms(&self, workshop_id: Option<&WorkshopId>) -> Result<Vec<VmInstance>, CoreError>;
}

/// Pure function: VM name for a workshop. Stable across retries so repeated
/// provisioning for the same workshop always targets the same VM name
/// (spec.md §8 invariant 3).
pub fn vm_name(workshop_id: &WorkshopId) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(workshop_id.as_str().as_bytes());
    let digest = hasher.finalize();
    let short = hex_prefix(&digest, 10);
    format!("wso-{short}")
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n.div_ceil(2)).map(|b| format!("{b:02x}")).collect::<String>()[..n].to_string()
}

/// Deterministic container/MicroVM port assignment for a seat
/// (spec.md §4.2: `3000 + 10*seat + {1,2,3}`).
pub fn seat_ports(seat_id: u32) -> (u16, u16, u16) {
    let base = 3000 + 10 * seat_id as u16;
    (base + 1, base + 2, base + 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_name_is_pure_and_stable() {
        let id = WorkshopId::from_string("wsh-fixed-id-123");
        assert_eq!(vm_name(&id), vm_name(&id));
    }

    #[test]
    fn vm_name_differs_across_workshops() {
        let a = vm_name(&WorkshopId::from_string("wsh-aaa"));
        let b = vm_name(&WorkshopId::from_string("wsh-bbb"));
        assert_ne!(a, b);
    }

    #[test]
    fn seat_ports_are_deterministic_and_spaced() {
        assert_eq!(seat_ports(1), (3011, 3012, 3013));
        assert_eq!(seat_ports(2), (3021, 3022, 3023));
    }
}
