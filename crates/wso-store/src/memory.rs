// SPDX-License-Identifier: MIT

//! In-memory `Store` adapter backing unit tests and the Mock composition
//! root: a `parking_lot::RwLock`-guarded map per table with compare-and-set
//! mutators, mirroring a plain relational repository rather than an
//! event-sourced log (SPEC_FULL.md §4.3).

use crate::port::Store;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use wso_core::{
    CoreError, Registration, Seat, SeatKey, User, WorkerVm, Workshop, WorkshopId, WorkshopStatus,
};

#[derive(Default)]
struct Tables {
    workshops: HashMap<WorkshopId, Workshop>,
    seats: HashMap<SeatKey, Seat>,
    worker_vms: HashMap<WorkshopId, WorkerVm>,
    registrations: HashMap<String, Registration>,
    users: HashMap<String, User>,
}

/// In-memory repository. Cheap to clone (shares the underlying lock), safe
/// to share across tasks.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: std::sync::Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_workshop(&self, workshop: Workshop) -> Result<(), CoreError> {
        let mut tables = self.tables.write();
        if tables.workshops.contains_key(&workshop.id) {
            return Err(CoreError::conflict(format!("workshop {} already exists", workshop.id)));
        }
        tables.workshops.insert(workshop.id, workshop);
        Ok(())
    }

    async fn get_workshop(&self, id: &WorkshopId) -> Result<Option<Workshop>, CoreError> {
        Ok(self.tables.read().workshops.get(id).cloned())
    }

    async fn list_workshops(&self, owner: Option<&str>) -> Result<Vec<Workshop>, CoreError> {
        let tables = self.tables.read();
        let mut out: Vec<Workshop> = tables
            .workshops
            .values()
            .filter(|w| match owner {
                Some(o) => w.owner_id.as_str() == o,
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by_key(|w| w.created_at_ms);
        Ok(out)
    }

    async fn update_workshop_status(
        &self,
        id: &WorkshopId,
        expected: WorkshopStatus,
        next: WorkshopStatus,
    ) -> Result<bool, CoreError> {
        let mut tables = self.tables.write();
        let Some(workshop) = tables.workshops.get_mut(id) else {
            return Err(CoreError::not_found(format!("workshop {id}")));
        };
        if workshop.status != expected {
            return Ok(false);
        }
        workshop.status = next;
        Ok(true)
    }

    async fn update_tunnel_url(&self, id: &WorkshopId, tunnel_url: String) -> Result<(), CoreError> {
        let mut tables = self.tables.write();
        let vm = tables
            .worker_vms
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(format!("worker vm for workshop {id}")))?;
        vm.tunnel_url = Some(tunnel_url);
        Ok(())
    }

    async fn create_seats(&self, workshop_id: &WorkshopId, count: u32) -> Result<(), CoreError> {
        let mut tables = self.tables.write();
        for seat_id in 1..=count {
            let seat = Seat::new_pending(*workshop_id, seat_id);
            tables.seats.insert(seat.key(), seat);
        }
        Ok(())
    }

    async fn get_seat(&self, key: SeatKey) -> Result<Option<Seat>, CoreError> {
        Ok(self.tables.read().seats.get(&key).cloned())
    }

    async fn list_seats(&self, workshop_id: &WorkshopId) -> Result<Vec<Seat>, CoreError> {
        let tables = self.tables.read();
        let mut out: Vec<Seat> =
            tables.seats.values().filter(|s| &s.workshop_id == workshop_id).cloned().collect();
        out.sort_by_key(|s| s.seat_id);
        Ok(out)
    }

    async fn update_seat(&self, seat: Seat) -> Result<(), CoreError> {
        self.tables.write().seats.insert(seat.key(), seat);
        Ok(())
    }

    async fn create_worker_vm(&self, vm: WorkerVm) -> Result<(), CoreError> {
        self.tables.write().worker_vms.insert(vm.workshop_id, vm);
        Ok(())
    }

    async fn get_worker_vm(&self, workshop_id: &WorkshopId) -> Result<Option<WorkerVm>, CoreError> {
        Ok(self.tables.read().worker_vms.get(workshop_id).cloned())
    }

    async fn list_worker_vms(&self) -> Result<Vec<WorkerVm>, CoreError> {
        Ok(self.tables.read().worker_vms.values().cloned().collect())
    }

    async fn update_worker_vm(&self, vm: WorkerVm) -> Result<(), CoreError> {
        self.tables.write().worker_vms.insert(vm.workshop_id, vm);
        Ok(())
    }

    async fn mark_worker_vm_removed(&self, workshop_id: &WorkshopId, now_ms: u64) -> Result<(), CoreError> {
        let mut tables = self.tables.write();
        if let Some(vm) = tables.worker_vms.get_mut(workshop_id) {
            vm.mark_removed(now_ms);
        }
        Ok(())
    }

    async fn get_worker_vm_private_key(&self, workshop_id: &WorkshopId) -> Result<Option<String>, CoreError> {
        Ok(self.tables.read().worker_vms.get(workshop_id).map(|vm| vm.ssh_private_key.clone()))
    }

    async fn create_registration(&self, registration: Registration) -> Result<(), CoreError> {
        let mut tables = self.tables.write();
        if tables.registrations.contains_key(&registration.access_code) {
            return Err(CoreError::conflict("access code collision"));
        }
        tables.registrations.insert(registration.access_code.clone(), registration);
        Ok(())
    }

    async fn get_registration_by_access_code(&self, access_code: &str) -> Result<Option<Registration>, CoreError> {
        Ok(self.tables.read().registrations.get(access_code).cloned())
    }

    async fn get_registration_by_email(
        &self,
        workshop_id: &WorkshopId,
        email: &str,
    ) -> Result<Option<Registration>, CoreError> {
        let tables = self.tables.read();
        Ok(tables
            .registrations
            .values()
            .find(|r| &r.workshop_id == workshop_id && r.email.as_deref() == Some(email))
            .cloned())
    }

    async fn count_registrations(&self, workshop_id: &WorkshopId) -> Result<u64, CoreError> {
        let tables = self.tables.read();
        Ok(tables.registrations.values().filter(|r| &r.workshop_id == workshop_id).count() as u64)
    }

    async fn update_registration(&self, registration: Registration) -> Result<(), CoreError> {
        self.tables.write().registrations.insert(registration.access_code.clone(), registration);
        Ok(())
    }

    async fn create_user(&self, user: User) -> Result<(), CoreError> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.email) {
            return Err(CoreError::conflict(format!("user {} already exists", user.email)));
        }
        tables.users.insert(user.email.clone(), user);
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        Ok(self.tables.read().users.get(email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        Ok(self.tables.read().users.values().cloned().collect())
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
