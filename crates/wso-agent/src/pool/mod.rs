// SPDX-License-Identifier: MIT

//! `MicroVMPool`: owns the set of MicroVMs on this worker host (spec.md
//! §4.5). A thread-safe map keyed by `(workshop, seat)`, mutated only from
//! the create/destroy handlers (spec.md §5 "Shared state").
//!
//! A `parking_lot::Mutex`-guarded map of per-instance metadata plus an
//! injected launcher that owns the actual process/tap/disk side effects,
//! so the pool itself stays testable without booting real MicroVMs.

mod launcher;

pub use launcher::{MockVmLauncher, ProcessVmLauncher, VmLauncher};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wso_core::CoreError;

/// `(workshop_id, seat_id)` — mirrors [`wso_core::SeatKey`] but this pool is
/// deliberately decoupled from `wso-core` / `wso-store`: MicroVM records are
/// in-memory only and never persisted (spec.md §3 "Ownership").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub workshop_id: String,
    pub seat_id: u32,
}

impl PoolKey {
    pub fn new(workshop_id: impl Into<String>, seat_id: u32) -> Self {
        Self { workshop_id: workshop_id.into(), seat_id }
    }
}

/// A running MicroVM as tracked by the pool (spec.md §4.5: "`Instance`
/// carries `(workshop_id, seat_id, ip)`").
#[derive(Debug, Clone)]
pub struct Instance {
    pub workshop_id: String,
    pub seat_id: u32,
    pub ip: String,
}

/// Request body for [`MicroVmPool::create`] (spec.md §4.4 `POST /vms`).
#[derive(Debug, Clone, Default)]
pub struct CreateSpec {
    pub vcpus: Option<u32>,
    pub memory_mb: Option<u32>,
}

/// Deterministic seat -> IP mapping on the agent's bridge subnet (spec.md
/// §4.5: `192.168.100.(10 + seat_id)`). Total and injective on any
/// `seat_id` that keeps `10 + seat_id` inside a `u8` (spec.md §8 invariant
/// 6, bounded by the `/24` bridge subnet).
pub fn seat_ip(bridge_ip: &str, seat_id: u32) -> Option<String> {
    let host = bridge_ip.split('/').next()?;
    let mut octets: Vec<u8> = host.split('.').map(|p| p.parse().ok()).collect::<Option<_>>()?;
    if octets.len() != 4 {
        return None;
    }
    let last = 10 + seat_id;
    if last > 254 {
        return None;
    }
    octets[3] = last as u8;
    Some(octets.iter().map(|o| o.to_string()).collect::<Vec<_>>().join("."))
}

/// Owns the in-memory MicroVM map for this host (spec.md §4.5, §9 "Global
/// mutable state": exactly one Pool per agent process).
pub struct MicroVmPool {
    bridge_ip: String,
    launcher: Arc<dyn VmLauncher>,
    instances: Mutex<HashMap<PoolKey, Instance>>,
}

impl MicroVmPool {
    pub fn new(bridge_ip: impl Into<String>, launcher: Arc<dyn VmLauncher>) -> Self {
        Self { bridge_ip: bridge_ip.into(), launcher, instances: Mutex::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Create(cfg) -> Instance` (spec.md §4.5). Idempotency: returns
    /// `Conflict` if `(workshop, seat)` already exists — this is the
    /// admission contract `POST /vms` surfaces as 409 (spec.md §8 invariant
    /// 5). Boot failure rolls back all side effects before returning
    /// (spec.md §4.5 "Failure").
    pub async fn create(&self, workshop_id: &str, seat_id: u32, spec: CreateSpec) -> Result<Instance, CoreError> {
        let key = PoolKey::new(workshop_id, seat_id);
        if self.instances.lock().contains_key(&key) {
            return Err(CoreError::conflict(format!("vm for {workshop_id}/{seat_id} already exists")));
        }
        let ip = seat_ip(&self.bridge_ip, seat_id)
            .ok_or_else(|| CoreError::invalid_input(format!("seat_id {seat_id} has no addressable bridge IP")))?;

        // Reserve the slot before the (slow, fallible) boot so a concurrent
        // create for the same seat observes the conflict immediately rather
        // than racing the launcher.
        let instance = Instance { workshop_id: workshop_id.to_string(), seat_id, ip: ip.clone() };
        {
            let mut instances = self.instances.lock();
            if instances.contains_key(&key) {
                return Err(CoreError::conflict(format!("vm for {workshop_id}/{seat_id} already exists")));
            }
            instances.insert(key, instance.clone());
        }

        if let Err(e) = self.launcher.boot(workshop_id, seat_id, &ip, &spec).await {
            self.instances.lock().remove(&key);
            return Err(e);
        }
        Ok(instance)
    }

    /// `Destroy(ws, seat)` (spec.md §4.5). Surfaces `NotFound` (404) for a
    /// missing VM (spec.md §4.5 "Idempotency").
    pub async fn destroy(&self, workshop_id: &str, seat_id: u32) -> Result<(), CoreError> {
        let key = PoolKey::new(workshop_id, seat_id);
        if !self.instances.lock().contains_key(&key) {
            return Err(CoreError::not_found(format!("vm for {workshop_id}/{seat_id}")));
        }
        self.launcher.teardown(workshop_id, seat_id).await?;
        self.instances.lock().remove(&key);
        Ok(())
    }

    pub fn get(&self, workshop_id: &str, seat_id: u32) -> Option<Instance> {
        self.instances.lock().get(&PoolKey::new(workshop_id, seat_id)).cloned()
    }

    pub fn get_ip(&self, workshop_id: &str, seat_id: u32) -> Option<String> {
        self.get(workshop_id, seat_id).map(|i| i.ip)
    }

    pub fn list(&self, workshop_id: Option<&str>) -> Vec<Instance> {
        let instances = self.instances.lock();
        let mut out: Vec<Instance> = instances
            .values()
            .filter(|i| match workshop_id {
                Some(w) => i.workshop_id == w,
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.workshop_id.as_str(), a.seat_id).cmp(&(b.workshop_id.as_str(), b.seat_id)));
        out
    }

    /// Orphan reconciliation at startup (spec.md §9 Open Question (a),
    /// resolved in SPEC_FULL.md §4.5: implemented per "recommended"): any
    /// on-disk per-seat artifact directory with no matching pool entry
    /// (the pool is always empty right after process start, since MicroVM
    /// records are never persisted) is destroyed and logged.
    pub async fn reconcile_orphans(&self) -> Result<usize, CoreError> {
        self.launcher.destroy_all_orphans().await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
