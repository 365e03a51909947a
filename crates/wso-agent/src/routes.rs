// SPDX-License-Identifier: MIT

//! AgentAPI HTTP surface (spec.md §4.4, §6): health, info, and VM
//! admission, plus the proxy routes mounted unauthenticated.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use wso_core::CoreError;
use wso_wire::{CreateVmRequest, HealthResponse, InfoResponse, VmListResponse, VmObject};

use crate::http_error::ApiError;
use crate::pool::CreateSpec;
use crate::{auth, proxy, AppState};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/info", get(info))
        .route("/vms", get(list_vms).post(create_vm))
        .route("/vms/:ws/:seat", get(get_vm).delete(delete_vm))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(proxy::router())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.config.worker_id.clone(),
        state.pool.len(),
        state.config.capacity,
        state.uptime_seconds(),
    ))
}

async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let current_vms = state.pool.len();
    Json(InfoResponse {
        worker_id: state.config.worker_id.clone(),
        version: crate::env::VERSION.to_string(),
        capacity: state.config.capacity,
        current_vms,
        available_slots: state.config.capacity.saturating_sub(current_vms),
        bridge_ip: state.config.bridge_ip.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    workshop_id: Option<String>,
}

async fn list_vms(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Json<VmListResponse> {
    let vms = state
        .pool
        .list(q.workshop_id.as_deref())
        .into_iter()
        .map(|i| VmObject::running(i.workshop_id, i.seat_id, i.ip))
        .collect();
    Json(VmListResponse { vms })
}

/// `POST /vms` admission (spec.md §4.4 "Admission"): validate `seat_id`,
/// enforce capacity before touching the pool, then delegate idempotency
/// (409 on duplicate) to the pool itself.
async fn create_vm(
    State(state): State<AppState>,
    Json(body): Json<CreateVmRequest>,
) -> Result<(StatusCode, Json<VmObject>), ApiError> {
    if body.seat_id <= 0 {
        return Err(CoreError::invalid_input(format!("seat_id must be positive, got {}", body.seat_id)).into());
    }
    let seat_id = body.seat_id as u32;

    if state.pool.len() >= state.config.capacity {
        return Err(CoreError::CapacityExhausted(format!(
            "pool at capacity ({}/{})",
            state.pool.len(),
            state.config.capacity
        ))
        .into());
    }

    let deadline = std::time::Duration::from_secs(60);
    let spec = CreateSpec { vcpus: body.vcpus, memory_mb: body.memory_mb };
    let instance = tokio::time::timeout(deadline, state.pool.create(&body.workshop_id, seat_id, spec))
        .await
        .map_err(|_| CoreError::Timeout("microvm create deadline exceeded".into()))??;

    Ok((StatusCode::CREATED, Json(VmObject::running(instance.workshop_id, instance.seat_id, instance.ip))))
}

async fn get_vm(State(state): State<AppState>, Path((workshop_id, seat_id)): Path<(String, u32)>) -> Result<Json<VmObject>, ApiError> {
    let instance = state
        .pool
        .get(&workshop_id, seat_id)
        .ok_or_else(|| CoreError::not_found(format!("vm for {workshop_id}/{seat_id}")))?;
    Ok(Json(VmObject::running(instance.workshop_id, instance.seat_id, instance.ip)))
}

async fn delete_vm(State(state): State<AppState>, Path((workshop_id, seat_id)): Path<(String, u32)>) -> Result<StatusCode, ApiError> {
    state.pool.destroy(&workshop_id, seat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
