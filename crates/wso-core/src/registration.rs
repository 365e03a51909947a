// SPDX-License-Identifier: MIT

//! Registration: a learner's claim on a workshop, redeemed for a seat.

use crate::workshop::WorkshopId;
use rand::Rng;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a registration row.
    pub struct RegistrationId("reg-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    Active,
}

crate::simple_display! {
    RegistrationStatus {
        Registered => "registered",
        Active => "active",
    }
}

/// `(workshop_id, email)` unique when `email` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub workshop_id: WorkshopId,
    pub email: Option<String>,
    /// User-facing credential in `XXX-XXXX` format.
    pub access_code: String,
    pub seat_id: Option<u32>,
    pub status: RegistrationStatus,
}

impl Registration {
    pub fn new(workshop_id: WorkshopId, email: Option<String>) -> Self {
        Self {
            id: RegistrationId::new(),
            workshop_id,
            email,
            access_code: generate_access_code(&mut rand::thread_rng()),
            seat_id: None,
            status: RegistrationStatus::Registered,
        }
    }

    /// Assign a seat and flip to `active` on redemption against a running
    /// workshop (spec.md §3, §6 learner redemption endpoint).
    pub fn redeem(&mut self, seat_id: u32) {
        self.seat_id = Some(seat_id);
        self.status = RegistrationStatus::Active;
    }
}

const ACCESS_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate an `XXX-XXXX` access code, excluding visually ambiguous
/// characters (`0`, `O`, `1`, `I`).
pub fn generate_access_code(rng: &mut impl Rng) -> String {
    let mut part = |n: usize| -> String {
        (0..n).map(|_| ACCESS_CODE_ALPHABET[rng.gen_range(0..ACCESS_CODE_ALPHABET.len())] as char).collect()
    };
    format!("{}-{}", part(3), part(4))
}

/// Generate an unguessable 9-character workshop join code (spec.md §3).
pub fn generate_workshop_code(rng: &mut impl Rng) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..9).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
