// SPDX-License-Identifier: MIT

//! Bit-exact Agent HTTP wire contract (spec.md §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub worker_id: String,
    pub vm_count: usize,
    pub capacity: usize,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    pub fn healthy(worker_id: String, vm_count: usize, capacity: usize, uptime_seconds: u64) -> Self {
        Self { status: "healthy", worker_id, vm_count, capacity, uptime_seconds }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoResponse {
    pub worker_id: String,
    pub version: String,
    pub capacity: usize,
    pub current_vms: usize,
    pub available_slots: usize,
    pub bridge_ip: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmObject {
    pub workshop_id: String,
    pub seat_id: u32,
    pub ip: String,
    pub status: &'static str,
}

impl VmObject {
    pub fn running(workshop_id: impl Into<String>, seat_id: u32, ip: impl Into<String>) -> Self {
        Self { workshop_id: workshop_id.into(), seat_id, ip: ip.into(), status: "running" }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmListResponse {
    pub vms: Vec<VmObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CreateVmRequest {
    pub workshop_id: String,
    pub seat_id: i64,
    #[serde(default)]
    pub vcpus: Option<u32>,
    #[serde(default)]
    pub memory_mb: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyHealthResponse {
    pub workshop_id: String,
    pub seat_id: u32,
    pub vm_ip: String,
    pub status: &'static str,
    pub terminal: bool,
    pub files: bool,
}

impl ProxyHealthResponse {
    pub fn new(workshop_id: impl Into<String>, seat_id: u32, vm_ip: impl Into<String>, terminal: bool, files: bool) -> Self {
        Self {
            workshop_id: workshop_id.into(),
            seat_id,
            vm_ip: vm_ip.into(),
            status: if terminal && files { "healthy" } else { "unhealthy" },
            terminal,
            files,
        }
    }
}
