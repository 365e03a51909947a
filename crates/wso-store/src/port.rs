// SPDX-License-Identifier: MIT

//! `Store` port: transactional persistence of workshops, seats, worker VMs,
//! registrations, and users (spec.md §4.3).
//!
//! `update_workshop_status` is the compare-and-set mutator the coordinator
//! relies on to serialize provisioning per workshop (spec.md §4.1, §8
//! invariant 2) — it must succeed only when the row's current status
//! matches `expected`, and the transition must be atomic with respect to
//! concurrent callers.

use async_trait::async_trait;
use wso_core::{
    CoreError, Registration, Seat, SeatKey, User, WorkerVm, Workshop, WorkshopId, WorkshopStatus,
};

#[async_trait]
pub trait Store: Send + Sync {
    // -- workshops --
    async fn create_workshop(&self, workshop: Workshop) -> Result<(), CoreError>;
    async fn get_workshop(&self, id: &WorkshopId) -> Result<Option<Workshop>, CoreError>;
    async fn list_workshops(&self, owner: Option<&str>) -> Result<Vec<Workshop>, CoreError>;
    /// Atomically transition `id` from `expected` to `next`. Returns `Ok(false)`
    /// (not an error) when the row's current status does not match `expected` —
    /// that is the normal "someone else already moved it" outcome callers use
    /// to avoid double-dispatching a provisioning task.
    async fn update_workshop_status(
        &self,
        id: &WorkshopId,
        expected: WorkshopStatus,
        next: WorkshopStatus,
    ) -> Result<bool, CoreError>;
    async fn update_tunnel_url(&self, id: &WorkshopId, tunnel_url: String) -> Result<(), CoreError>;

    // -- seats / sessions --
    async fn create_seats(&self, workshop_id: &WorkshopId, count: u32) -> Result<(), CoreError>;
    async fn get_seat(&self, key: SeatKey) -> Result<Option<Seat>, CoreError>;
    async fn list_seats(&self, workshop_id: &WorkshopId) -> Result<Vec<Seat>, CoreError>;
    async fn update_seat(&self, seat: Seat) -> Result<(), CoreError>;

    // -- worker vms --
    async fn create_worker_vm(&self, vm: WorkerVm) -> Result<(), CoreError>;
    async fn get_worker_vm(&self, workshop_id: &WorkshopId) -> Result<Option<WorkerVm>, CoreError>;
    async fn list_worker_vms(&self) -> Result<Vec<WorkerVm>, CoreError>;
    async fn update_worker_vm(&self, vm: WorkerVm) -> Result<(), CoreError>;
    async fn mark_worker_vm_removed(&self, workshop_id: &WorkshopId, now_ms: u64) -> Result<(), CoreError>;
    /// Returns the stored (encrypted-at-rest-outside-this-crate) private key
    /// so the composition root's secrets layer can decrypt it on demand —
    /// this trait never decrypts (spec.md §3 WorkerVM note).
    async fn get_worker_vm_private_key(&self, workshop_id: &WorkshopId) -> Result<Option<String>, CoreError>;

    // -- registrations --
    async fn create_registration(&self, registration: Registration) -> Result<(), CoreError>;
    async fn get_registration_by_access_code(&self, access_code: &str) -> Result<Option<Registration>, CoreError>;
    async fn get_registration_by_email(
        &self,
        workshop_id: &WorkshopId,
        email: &str,
    ) -> Result<Option<Registration>, CoreError>;
    async fn count_registrations(&self, workshop_id: &WorkshopId) -> Result<u64, CoreError>;
    async fn update_registration(&self, registration: Registration) -> Result<(), CoreError>;

    // -- users --
    async fn create_user(&self, user: User) -> Result<(), CoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError>;
    async fn list_users(&self) -> Result<Vec<User>, CoreError>;

    /// Backing-store connectivity probe for the CP's `/healthz` (SPEC_FULL §6 addition).
    async fn health_check(&self) -> Result<(), CoreError>;
}
