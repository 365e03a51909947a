// SPDX-License-Identifier: MIT

//! WorkerVM: the cloud VM that hosts the Agent and its MicroVM pool.
//!
//! One row per workshop. Deleting a workshop marks this row `removed` but
//! retains it for post-mortem (spec.md §3).

use crate::workshop::WorkshopId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a worker VM record.
    pub struct VmRecordId("vmr-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerVmStatus {
    Provisioning,
    Running,
    Removed,
}

crate::simple_display! {
    WorkerVmStatus {
        Provisioning => "provisioning",
        Running => "running",
        Removed => "removed",
    }
}

/// One row per workshop mapping workshop -> worker host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerVm {
    pub id: VmRecordId,
    pub workshop_id: WorkshopId,
    pub vm_name: String,
    pub vm_id: String,
    pub zone: String,
    pub machine_type: String,
    pub external_ip: Option<String>,
    pub internal_ip: Option<String>,
    pub status: WorkerVmStatus,
    pub ssh_public_key: String,
    /// Stored encrypted at rest outside this crate's concern; this field
    /// carries whatever ciphertext the composition root's secrets layer
    /// produced.
    pub ssh_private_key: String,
    pub provisioning_started_at_ms: Option<u64>,
    pub provisioning_completed_at_ms: Option<u64>,
    pub provisioning_duration_ms: Option<u64>,
    pub tunnel_url: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl WorkerVm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workshop_id: WorkshopId,
        vm_name: impl Into<String>,
        vm_id: impl Into<String>,
        zone: impl Into<String>,
        machine_type: impl Into<String>,
        ssh_public_key: impl Into<String>,
        ssh_private_key: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id: VmRecordId::new(),
            workshop_id,
            vm_name: vm_name.into(),
            vm_id: vm_id.into(),
            zone: zone.into(),
            machine_type: machine_type.into(),
            external_ip: None,
            internal_ip: None,
            status: WorkerVmStatus::Provisioning,
            ssh_public_key: ssh_public_key.into(),
            ssh_private_key: ssh_private_key.into(),
            provisioning_started_at_ms: Some(now_ms),
            provisioning_completed_at_ms: None,
            provisioning_duration_ms: None,
            tunnel_url: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Record a successful `CreateVM` result and flip to `running`.
    pub fn mark_running(&mut self, external_ip: String, internal_ip: String, now_ms: u64) {
        self.external_ip = Some(external_ip);
        self.internal_ip = Some(internal_ip);
        self.status = WorkerVmStatus::Running;
        self.provisioning_completed_at_ms = Some(now_ms);
        self.provisioning_duration_ms =
            Some(now_ms.saturating_sub(self.provisioning_started_at_ms.unwrap_or(now_ms)));
        self.updated_at_ms = now_ms;
    }

    pub fn mark_removed(&mut self, now_ms: u64) {
        self.status = WorkerVmStatus::Removed;
        self.updated_at_ms = now_ms;
    }

    /// Endpoint learners are routed to once the tunnel registers, else a
    /// direct-IP fallback keyed by runtime (spec.md §6 learner redemption).
    pub fn learner_endpoint(&self, runtime_type: crate::workshop::RuntimeType) -> Option<String> {
        if let Some(url) = &self.tunnel_url {
            return Some(url.clone());
        }
        let ip = self.external_ip.as_ref()?;
        let port = match runtime_type {
            crate::workshop::RuntimeType::Firecracker => 9090,
            crate::workshop::RuntimeType::Docker => 8080,
        };
        Some(format!("http://{ip}:{port}"))
    }
}

#[cfg(test)]
#[path = "worker_vm_tests.rs"]
mod tests;
