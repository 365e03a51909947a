// SPDX-License-Identifier: MIT

//! `WorkshopCoordinator`: owns workshop lifecycle and drives VM
//! provisioning asynchronously without coupling to the HTTP request that
//! initiated it (spec.md §4.1).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::thread_rng;
use tokio::task::JoinHandle;
use tracing::warn;

use wso_core::{generate_workshop_code, Clock, CoreError, RuntimeType, SystemClock, UserId, Workshop, WorkshopId, WorkshopStatus};
use wso_store::Store;

use crate::backends::Backends;

/// Static provisioning defaults and secrets the coordinator injects into
/// every `VmConfig` it builds (spec.md §4.1 step 2).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub machine_type: String,
    pub disk_gb: u32,
    pub use_spot: bool,
    pub zone: String,
    /// URL the booting worker host's tunnel manager registers back against
    /// (`BACKEND_URL`, spec.md §6).
    pub backend_url: String,
    pub workspace_token_secret: String,
    /// Bearer token the Docker-runtime agent authenticates with.
    pub docker_agent_token: String,
    pub provisioning_deadline: Duration,
    pub teardown_deadline: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            machine_type: "e2-standard-4".into(),
            disk_gb: 50,
            use_spot: false,
            zone: "us-central1-a".into(),
            backend_url: String::new(),
            workspace_token_secret: String::new(),
            docker_agent_token: String::new(),
            provisioning_deadline: Duration::from_secs(5 * 60),
            teardown_deadline: Duration::from_secs(5 * 60),
        }
    }
}

/// Dependencies wired at the composition root.
pub struct CoordinatorDeps {
    pub store: Arc<dyn Store>,
    pub backends: Backends,
}

/// Owns workshop lifecycle and drives VM provisioning asynchronously
/// (spec.md §4.1). Generic over [`Clock`] so tests can drive time
/// deterministically; production code uses the default [`SystemClock`].
///
/// Always constructed behind an `Arc` by the composition root: the
/// dispatch methods need `Arc<Self>` to hand a `'static` task body to
/// `tokio::spawn`.
pub struct WorkshopCoordinator<C: Clock = SystemClock> {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) backends: Backends,
    pub(crate) clock: C,
    pub(crate) config: CoordinatorConfig,
    /// Supervised task registry, purely for graceful-shutdown draining and
    /// for rejecting a second dispatch before even reaching the store's
    /// compare-and-set (SPEC_FULL.md §4.1 addition) — an optimization, not
    /// a replacement for the CAS invariant enforced by `transition_to_provisioning`.
    pub(crate) tasks: Mutex<HashMap<WorkshopId, JoinHandle<()>>>,
}

impl WorkshopCoordinator<SystemClock> {
    pub fn new(deps: CoordinatorDeps, config: CoordinatorConfig) -> Arc<Self> {
        Self::with_clock(deps, config, SystemClock)
    }
}

impl<C: Clock> WorkshopCoordinator<C> {
    pub fn with_clock(deps: CoordinatorDeps, config: CoordinatorConfig, clock: C) -> Arc<Self> {
        Arc::new(Self {
            store: deps.store,
            backends: deps.backends,
            clock,
            config,
            tasks: Mutex::new(HashMap::new()),
        })
    }

    /// `CreateWorkshop(name, seats, api_key, runtime, owner) -> Workshop` (spec.md §4.1).
    ///
    /// `api_key` is accepted for interface parity with spec.md but is not
    /// consumed by the core provisioning path described here — instructor
    /// authentication is out of scope (spec.md §1).
    pub async fn create_workshop(
        self: &Arc<Self>,
        name: impl Into<String>,
        seats: u32,
        _api_key: Option<String>,
        runtime_type: RuntimeType,
        owner_id: UserId,
    ) -> Result<Workshop, CoreError> {
        if seats < 1 {
            return Err(CoreError::invalid_input("seats must be >= 1"));
        }

        let id = WorkshopId::new();
        let code = generate_workshop_code(&mut thread_rng());
        let mut workshop = Workshop::new(id, name, code, seats, owner_id, runtime_type, self.clock.epoch_ms());
        self.store.create_workshop(workshop.clone()).await?;
        self.store.create_seats(&id, seats).await?;

        // Synchronous created -> provisioning transition; the async task is
        // dispatched only after this succeeds (spec.md §4.1).
        let moved =
            self.store.update_workshop_status(&id, WorkshopStatus::Created, WorkshopStatus::Provisioning).await?;
        if !moved {
            return Err(CoreError::Internal(format!("workshop {id} left `created` before dispatch")));
        }
        workshop.status = WorkshopStatus::Provisioning;

        self.dispatch_provisioning(id);
        Ok(workshop)
    }

    /// `StartWorkshop(id)` — manual provisioning kick for stopped/errored
    /// workshops (spec.md §4.1). Dispatches the same task body and returns
    /// immediately.
    pub async fn start_workshop(self: &Arc<Self>, id: WorkshopId) -> Result<(), CoreError> {
        self.transition_to_provisioning(id).await?;
        self.dispatch_provisioning(id);
        Ok(())
    }

    /// Synchronous form of [`Self::start_workshop`] that awaits the full
    /// provisioning task and surfaces its result (spec.md §4.1: "synchronous
    /// form also exists that surfaces errors").
    pub async fn start_workshop_sync(self: &Arc<Self>, id: WorkshopId) -> Result<(), CoreError> {
        self.transition_to_provisioning(id).await?;
        self.run_provisioning(id).await
    }

    pub(crate) async fn transition_to_provisioning(&self, id: WorkshopId) -> Result<(), CoreError> {
        if self.has_task_in_flight(id) {
            return Err(CoreError::conflict(format!("workshop {id}: a coordinator task is already in flight")));
        }
        let workshop =
            self.store.get_workshop(&id).await?.ok_or_else(|| CoreError::not_found(format!("workshop {id}")))?;
        if !workshop.status.can_transition_to(WorkshopStatus::Provisioning) {
            return Err(CoreError::conflict(format!(
                "workshop {id} cannot be (re)provisioned from status {}",
                workshop.status
            )));
        }
        let moved = self.store.update_workshop_status(&id, workshop.status, WorkshopStatus::Provisioning).await?;
        if !moved {
            return Err(CoreError::conflict(format!("workshop {id}: concurrent status transition")));
        }
        Ok(())
    }

    /// `StopWorkshop(id)` — sets status to `stopping`, dispatches teardown,
    /// returns immediately (spec.md §4.1).
    pub async fn stop_workshop(self: &Arc<Self>, id: WorkshopId) -> Result<(), CoreError> {
        let moved =
            self.store.update_workshop_status(&id, WorkshopStatus::Running, WorkshopStatus::Stopping).await?;
        if !moved {
            return Err(CoreError::conflict(format!("workshop {id}: not running")));
        }
        self.dispatch_teardown(id, WorkshopStatus::Stopped);
        Ok(())
    }

    /// `DeleteWorkshop(id)` — sets status to `deleting`, dispatches
    /// teardown, returns immediately (spec.md §4.1). May be called from any
    /// state that legally transitions to `deleting`, including a workshop
    /// that never finished provisioning.
    pub async fn delete_workshop(self: &Arc<Self>, id: WorkshopId) -> Result<(), CoreError> {
        let workshop =
            self.store.get_workshop(&id).await?.ok_or_else(|| CoreError::not_found(format!("workshop {id}")))?;
        if !workshop.status.can_transition_to(WorkshopStatus::Deleting) {
            return Err(CoreError::conflict(format!(
                "workshop {id} cannot be deleted from status {}",
                workshop.status
            )));
        }
        let moved = self.store.update_workshop_status(&id, workshop.status, WorkshopStatus::Deleting).await?;
        if !moved {
            return Err(CoreError::conflict(format!("workshop {id}: concurrent status transition")));
        }
        self.dispatch_teardown(id, WorkshopStatus::Deleted);
        Ok(())
    }

    pub async fn get_workshop(&self, id: &WorkshopId) -> Result<Option<Workshop>, CoreError> {
        self.store.get_workshop(id).await
    }

    pub async fn list_workshops(&self, owner: Option<&str>) -> Result<Vec<Workshop>, CoreError> {
        self.store.list_workshops(owner).await
    }

    /// `RegisterTunnelURL(workshop_id, url)` — internal endpoint used by the
    /// Agent to persist its tunnel URL; idempotent (spec.md §4.1).
    pub async fn register_tunnel_url(&self, id: &WorkshopId, url: String) -> Result<(), CoreError> {
        self.store.update_tunnel_url(id, url).await
    }

    /// Abort all in-flight provisioning/teardown tasks (graceful shutdown,
    /// SPEC_FULL.md §4.1 addition). Idempotent.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        for (id, handle) in tasks.drain() {
            warn!(workshop_id = %id, "aborting in-flight coordinator task on shutdown");
            handle.abort();
        }
    }

    fn dispatch_provisioning(self: &Arc<Self>, id: WorkshopId) {
        self.spawn_supervised(id, move |this| async move {
            if let Err(e) = this.run_provisioning(id).await {
                tracing::error!(workshop_id = %id, error = %e, "provisioning task failed");
            }
        });
    }

    fn dispatch_teardown(self: &Arc<Self>, id: WorkshopId, terminal: WorkshopStatus) {
        self.spawn_supervised(id, move |this| async move {
            this.run_teardown(id, terminal).await;
        });
    }

    /// Await the in-flight provisioning/teardown task for `id`, if any.
    /// Test-only: production callers never need to block on a dispatched
    /// task, that is the entire point of dispatching it.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn wait_for_task(&self, id: WorkshopId) {
        let handle = self.tasks.lock().remove(&id);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Fast-path check: is there a still-running task for this workshop?
    /// An optimization ahead of the store's compare-and-set, not a
    /// replacement for it (SPEC_FULL.md §4.1 addition).
    fn has_task_in_flight(&self, id: WorkshopId) -> bool {
        let mut tasks = self.tasks.lock();
        if let Some(handle) = tasks.get(&id) {
            if !handle.is_finished() {
                return true;
            }
            tasks.remove(&id);
        }
        false
    }

    fn spawn_supervised<F, Fut>(self: &Arc<Self>, id: WorkshopId, make_fut: F)
    where
        F: FnOnce(Arc<Self>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
        C: 'static,
    {
        let this = Arc::clone(self);
        let handle = tokio::spawn(make_fut(this));
        self.tasks.lock().insert(id, handle);
    }
}
