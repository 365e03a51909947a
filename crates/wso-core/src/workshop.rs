// SPDX-License-Identifier: MIT

//! Workshop identifier, status machine, and entity.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a workshop.
    pub struct WorkshopId("wsh-");
}

crate::define_id! {
    /// Unique identifier for a user (instructor or admin).
    pub struct UserId("usr-");
}

/// Compute backend a workshop's seats run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeType {
    Docker,
    Firecracker,
}

crate::simple_display! {
    RuntimeType {
        Docker => "docker",
        Firecracker => "firecracker",
    }
}

/// Workshop lifecycle status (spec.md §4.1 FSM).
///
/// `created -> provisioning -> running -> (stopping|deleting) -> (stopped|deleted)`,
/// or `error` as a terminal state reachable from `provisioning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkshopStatus {
    Created,
    Provisioning,
    Running,
    Stopping,
    Deleting,
    Stopped,
    Deleted,
    Error,
}

crate::simple_display! {
    WorkshopStatus {
        Created => "created",
        Provisioning => "provisioning",
        Running => "running",
        Stopping => "stopping",
        Deleting => "deleting",
        Stopped => "stopped",
        Deleted => "deleted",
        Error => "error",
    }
}

impl WorkshopStatus {
    /// Whether `self -> next` is a legal transition per the FSM.
    ///
    /// The coordinator never makes this check directly — it is applied as a
    /// precondition inside the store's compare-and-set `UpdateWorkshopStatus`
    /// so that concurrent callers never both succeed (spec.md §4.1, §4.3).
    pub fn can_transition_to(self, next: WorkshopStatus) -> bool {
        use WorkshopStatus::*;
        matches!(
            (self, next),
            (Created, Provisioning)
                | (Provisioning, Running)
                | (Provisioning, Error)
                | (Running, Stopping)
                | (Running, Deleting)
                | (Stopping, Stopped)
                | (Deleting, Deleted)
                | (Stopped, Provisioning) // StartWorkshop re-provisioning
                | (Error, Provisioning) // StartWorkshop retry after error
                // DeleteWorkshop must also converge a workshop that never
                // reached `running` (or errored before it did) to a terminal
                // state without a worker host to tear down.
                | (Created, Deleting)
                | (Error, Deleting)
                | (Stopped, Deleting)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkshopStatus::Stopped | WorkshopStatus::Deleted | WorkshopStatus::Error)
    }
}

/// A scheduled workshop with N seats, one worker host, and N MicroVMs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workshop {
    pub id: WorkshopId,
    pub name: String,
    /// Unguessable 9-character public join code.
    pub code: String,
    /// Number of learner seats. Immutable after creation.
    pub seats: u32,
    pub owner_id: UserId,
    pub runtime_type: RuntimeType,
    pub status: WorkshopStatus,
    pub created_at_ms: u64,
}

impl Workshop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: WorkshopId,
        name: impl Into<String>,
        code: impl Into<String>,
        seats: u32,
        owner_id: UserId,
        runtime_type: RuntimeType,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            code: code.into(),
            seats,
            owner_id,
            runtime_type,
            status: WorkshopStatus::Created,
            created_at_ms,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder_fn! {
    pub struct WorkshopBuilder => Workshop {
        id: WorkshopId = WorkshopId::new(),
        name: String = "test-workshop",
        code: String = "abc123def",
        seats: u32 = 3,
        owner_id: UserId = UserId::new(),
        runtime_type: RuntimeType = RuntimeType::Docker,
        status: WorkshopStatus = WorkshopStatus::Created,
        created_at_ms: u64 = 1_700_000_000_000,
    }
}

#[cfg(test)]
#[path = "workshop_tests.rs"]
mod tests;
