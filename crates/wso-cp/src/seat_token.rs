// SPDX-License-Identifier: MIT

//! Short-lived workspace JWT binding `(workshop_id, seat_id)` (spec.md §6
//! learner redemption endpoint).

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use wso_core::{CoreError, WorkshopId};

const TTL_SECS: i64 = 15 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeatClaims {
    workshop_id: String,
    seat: u32,
    exp: i64,
    iat: i64,
}

/// Mint a JWT binding `(workshop_id, seat_id)` with a 15-minute TTL.
pub fn mint_seat_token(secret: &str, workshop_id: &WorkshopId, seat: u32) -> Result<String, CoreError> {
    let now = chrono::Utc::now().timestamp();
    let claims = SeatClaims { workshop_id: workshop_id.to_string(), seat, exp: now + TTL_SECS, iat: now };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| CoreError::Internal(format!("seat token signing failed: {e}")))
}

#[cfg(test)]
#[path = "seat_token_tests.rs"]
mod tests;
