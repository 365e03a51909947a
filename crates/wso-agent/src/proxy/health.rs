// SPDX-License-Identifier: MIT

//! `/proxy/{ws}/{seat}/health` (spec.md §4.6 "Composite health probe"):
//! concurrently probes the terminal and files ports with a 5-second
//! timeout each.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::net::TcpStream;

use crate::http_error::ApiError;
use crate::AppState;
use wso_wire::ProxyHealthResponse;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn probe(
    State(state): State<AppState>,
    Path((workshop_id, seat_id)): Path<(String, u32)>,
) -> Response {
    let vm_ip = match super::resolve_vm_ip(&state, &workshop_id, seat_id) {
        Ok(ip) => ip,
        Err(e) => return ApiError(e).into_response(),
    };

    let (terminal, files) = tokio::join!(
        probe_port(&vm_ip, super::TERMINAL_PORT),
        probe_port(&vm_ip, super::FILES_PORT),
    );

    Json(ProxyHealthResponse::new(workshop_id, seat_id, vm_ip, terminal, files)).into_response()
}

async fn probe_port(vm_ip: &str, port: u16) -> bool {
    tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((vm_ip, port))).await.is_ok_and(|r| r.is_ok())
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
