// SPDX-License-Identifier: MIT

//! AgentProxy (spec.md §4.6): WebSocket and HTTP reverse proxy to the
//! per-seat MicroVM, plus the composite health probe.

mod health;
mod http;
mod ws;

use axum::routing::{any, get};
use axum::Router;

use crate::AppState;

pub const TERMINAL_PORT: u16 = 3001;
pub const FILES_PORT: u16 = 3002;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/proxy/:ws/:seat/terminal", get(ws::terminal))
        .route("/proxy/:ws/:seat/health", get(health::probe))
        .route("/proxy/:ws/:seat/files", any(http::files))
        .route("/proxy/:ws/:seat/files/*rest", any(http::files))
}

/// Resolve the MicroVM ip for `(workshop_id, seat_id)`, 404ing through the
/// standard error envelope when the path parameters don't name a live VM
/// (spec.md §4.6 steps 1, §8 scenario 7).
fn resolve_vm_ip(state: &AppState, workshop_id: &str, seat_id: u32) -> Result<String, wso_core::CoreError> {
    state
        .pool
        .get_ip(workshop_id, seat_id)
        .ok_or_else(|| wso_core::CoreError::not_found(format!("vm for {workshop_id}/{seat_id}")))
}
