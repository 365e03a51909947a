// SPDX-License-Identifier: MIT

//! Seat (learner session) identifier, status, and entity.

use crate::workshop::WorkshopId;
use serde::{Deserialize, Serialize};

/// `(workshop_id, seat_id)` uniquely identifies a seat. `seat_id` is
/// 1-indexed within `[1..=workshop.seats]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    pub workshop_id: WorkshopId,
    pub seat_id: u32,
}

impl SeatKey {
    pub fn new(workshop_id: WorkshopId, seat_id: u32) -> Self {
        Self { workshop_id, seat_id }
    }
}

impl std::fmt::Display for SeatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workshop_id, self.seat_id)
    }
}

/// Status of a seat in its lifecycle.
///
/// A seat is `pending` until its workshop reaches `running`, then `ready`;
/// assignment to a learner flips it to `occupied` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Pending,
    Ready,
    Occupied,
}

crate::simple_display! {
    SeatStatus {
        Pending => "pending",
        Ready => "ready",
        Occupied => "occupied",
    }
}

/// A single learner slot within a workshop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub workshop_id: WorkshopId,
    pub seat_id: u32,
    /// Hash of the reconnect token handed to the learner's client, allowing
    /// them to resume the same seat without re-redeeming their access code.
    pub reconnect_hash: Option<String>,
    pub learner_name: Option<String>,
    pub status: SeatStatus,
    pub ip: Option<String>,
    pub container_id: Option<String>,
}

impl Seat {
    pub fn new_pending(workshop_id: WorkshopId, seat_id: u32) -> Self {
        Self {
            workshop_id,
            seat_id,
            reconnect_hash: None,
            learner_name: None,
            status: SeatStatus::Pending,
            ip: None,
            container_id: None,
        }
    }

    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.workshop_id, self.seat_id)
    }

    /// Transition pending -> ready once the workshop's worker host has an IP.
    pub fn mark_ready(&mut self, ip: impl Into<String>) {
        self.status = SeatStatus::Ready;
        self.ip = Some(ip.into());
    }

    /// Transition ready -> occupied once a learner redeems an access code.
    pub fn mark_occupied(&mut self, learner_name: Option<String>) {
        self.status = SeatStatus::Occupied;
        self.learner_name = learner_name;
    }
}

#[cfg(test)]
#[path = "seat_tests.rs"]
mod tests;
