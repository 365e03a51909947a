// SPDX-License-Identifier: MIT

//! Provisioning and teardown task bodies (spec.md §4.1).
//!
//! Both run on a background-scoped cancellation context owned by the task
//! itself, not the HTTP request context that triggered dispatch (spec.md
//! §9 "Async decoupling from HTTP").

use tracing::{error, info, warn};

use wso_core::{Clock, CoreError, SeatKey, WorkerVm, WorkshopId, WorkshopStatus};
use wso_vmbackend::VmConfig;

use crate::coordinator::WorkshopCoordinator;
use crate::sshkey::generate_ssh_keypair;

impl<C: Clock> WorkshopCoordinator<C> {
    /// Steps 1-6 of spec.md §4.1's provisioning task. Never surfaces errors
    /// to an HTTP caller — the dispatching request already returned; this
    /// persists `status=error` and logs structured diagnostics on failure
    /// (spec.md §7).
    pub(crate) async fn run_provisioning(&self, id: WorkshopId) -> Result<(), CoreError> {
        let result = self.run_provisioning_inner(id).await;
        if let Err(ref e) = result {
            error!(workshop_id = %id, error = %e, "provisioning failed, marking workshop errored");
            if let Err(cas_err) =
                self.store.update_workshop_status(&id, WorkshopStatus::Provisioning, WorkshopStatus::Error).await
            {
                error!(workshop_id = %id, error = %cas_err, "failed to persist error status after provisioning failure");
            }
        }
        result
    }

    async fn run_provisioning_inner(&self, id: WorkshopId) -> Result<(), CoreError> {
        let workshop =
            self.store.get_workshop(&id).await?.ok_or_else(|| CoreError::not_found(format!("workshop {id}")))?;

        // Step 1: SSH keypair bound to the workshop ID.
        let (ssh_public_key, ssh_private_key) = generate_ssh_keypair(&id)?;

        // Step 2: VmConfig, injecting worker-agent token / backend URL /
        // workspace-token secret as instance metadata.
        let backend = self.backends.resolve(workshop.runtime_type)?;
        let cfg = VmConfig {
            workshop_id: id,
            seats: workshop.seats,
            machine_type: self.config.machine_type.clone(),
            disk_gb: self.config.disk_gb,
            use_spot: self.config.use_spot,
            zone: self.config.zone.clone(),
            ssh_public_key: ssh_public_key.clone(),
            runtime_type: workshop.runtime_type,
            worker_agent_token: self.config.docker_agent_token.clone(),
            backend_url: self.config.backend_url.clone(),
            workspace_token_secret: self.config.workspace_token_secret.clone(),
        };

        // Step 3: record provisioning_started_at by creating (or reusing,
        // on a StartWorkshop retry) the WorkerVm row before the call that
        // can take up to 5 minutes.
        let now_ms = self.clock.epoch_ms();
        let vm_name = wso_vmbackend::vm_name(&id);
        let existing = self.store.get_worker_vm(&id).await?;
        let mut vm_row = match existing {
            Some(mut row) => {
                row.status = wso_core::WorkerVmStatus::Provisioning;
                row.provisioning_started_at_ms = Some(now_ms);
                row.ssh_public_key = ssh_public_key.clone();
                row.ssh_private_key = ssh_private_key.clone();
                self.store.update_worker_vm(row.clone()).await?;
                row
            }
            None => {
                let row = WorkerVm::new(
                    id,
                    vm_name,
                    String::new(),
                    self.config.zone.clone(),
                    self.config.machine_type.clone(),
                    ssh_public_key,
                    ssh_private_key,
                    now_ms,
                );
                self.store.create_worker_vm(row.clone()).await?;
                row
            }
        };

        // Step 4: CreateVM under a hard 5-minute deadline, on a freshly
        // derived background context (the task itself), not the originating
        // HTTP request's.
        let instance = tokio::time::timeout(self.config.provisioning_deadline, backend.create_vm(&cfg))
            .await
            .map_err(|_| CoreError::Timeout(format!("create_vm for workshop {id} exceeded provisioning deadline")))??;

        // Step 5: persist WorkerVm, flip seats to ready, flip workshop to running.
        let external_ip = instance
            .external_ip
            .clone()
            .ok_or_else(|| CoreError::UpstreamUnavailable("create_vm returned no external_ip".into()))?;
        let internal_ip = instance.internal_ip.clone().unwrap_or_default();
        vm_row.vm_id = instance.id.clone();
        vm_row.mark_running(external_ip.clone(), internal_ip, self.clock.epoch_ms());
        self.store.update_worker_vm(vm_row).await?;

        for seat_id in 1..=workshop.seats {
            let key = SeatKey::new(id, seat_id);
            if let Some(mut seat) = self.store.get_seat(key).await? {
                seat.mark_ready(external_ip.clone());
                self.store.update_seat(seat).await?;
            }
        }

        let moved =
            self.store.update_workshop_status(&id, WorkshopStatus::Provisioning, WorkshopStatus::Running).await?;
        if !moved {
            warn!(workshop_id = %id, "workshop left `provisioning` before running transition (concurrent teardown?)");
        }
        info!(workshop_id = %id, vm_id = %instance.id, "workshop provisioned");
        Ok(())
    }

    /// Teardown task: symmetric to provisioning. Never fails the workshop's
    /// transition to a terminal status on backend error — the row is left
    /// marked `removed` and the operator reconciles (spec.md §4.1).
    pub(crate) async fn run_teardown(&self, id: WorkshopId, terminal: WorkshopStatus) {
        let intermediate = match terminal {
            WorkshopStatus::Stopped => WorkshopStatus::Stopping,
            _ => WorkshopStatus::Deleting,
        };

        let workshop = match self.store.get_workshop(&id).await {
            Ok(Some(w)) => w,
            Ok(None) => {
                warn!(workshop_id = %id, "teardown: workshop vanished");
                return;
            }
            Err(e) => {
                error!(workshop_id = %id, error = %e, "teardown: failed to load workshop");
                return;
            }
        };

        if let Ok(backend) = self.backends.resolve(workshop.runtime_type) {
            match tokio::time::timeout(self.config.teardown_deadline, backend.delete_vm(&id)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(workshop_id = %id, error = %e, "teardown: delete_vm failed, swallowing"),
                Err(_) => warn!(workshop_id = %id, "teardown: delete_vm exceeded deadline, swallowing"),
            }
        }

        if let Err(e) = self.store.mark_worker_vm_removed(&id, self.clock.epoch_ms()).await {
            warn!(workshop_id = %id, error = %e, "teardown: failed to mark worker vm removed");
        }

        match self.store.update_workshop_status(&id, intermediate, terminal).await {
            Ok(true) => info!(workshop_id = %id, status = %terminal, "workshop torn down"),
            Ok(false) => warn!(workshop_id = %id, "teardown: status had already moved past the intermediate state"),
            Err(e) => error!(workshop_id = %id, error = %e, "teardown: failed to persist terminal status"),
        }
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
