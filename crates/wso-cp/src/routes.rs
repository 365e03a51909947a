// SPDX-License-Identifier: MIT

//! HTTP surface: workshop CRUD, the internal tunnel-registration endpoint,
//! the learner redemption endpoint, and `/healthz` (spec.md §6, SPEC_FULL §6).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use wso_core::{RuntimeType, UserId, WorkshopId, WorkshopStatus};
use wso_store::Store;
use wso_wire::{CreateWorkshopRequest, SessionRedemptionResponse, TunnelRegisterRequest, WorkshopResponse};

use crate::http_error::ApiError;
use crate::seat_token::mint_seat_token;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/workshops", post(create_workshop).get(list_workshops))
        .route("/api/workshops/:id", get(get_workshop))
        .route("/api/workshops/:id/start", post(start_workshop))
        .route("/api/workshops/:id/stop", post(stop_workshop))
        .route("/api/workshops/:id/delete", post(delete_workshop))
        .route("/api/internal/workshops/:id/tunnel", post(register_tunnel))
        .route("/api/session/:access_code", get(redeem_session))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.health_check().await?;
    Ok(Json(serde_json::json!({ "status": "healthy", "version": crate::env::VERSION })))
}

fn workshop_response(w: &wso_core::Workshop) -> WorkshopResponse {
    WorkshopResponse {
        id: w.id.to_string(),
        name: w.name.clone(),
        code: w.code.clone(),
        seats: w.seats,
        status: w.status.to_string(),
        runtime_type: w.runtime_type.to_string(),
    }
}

async fn create_workshop(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkshopRequest>,
) -> Result<(StatusCode, Json<WorkshopResponse>), ApiError> {
    let runtime_type = match body.runtime_type.as_deref() {
        Some("firecracker") => RuntimeType::Firecracker,
        Some("docker") | None => RuntimeType::Docker,
        Some(other) => {
            return Err(wso_core::CoreError::invalid_input(format!("unknown runtime_type: {other}")).into())
        }
    };
    // Instructor ownership/authentication is out of scope; a single
    // synthetic owner is used until an auth layer is wired in (spec.md §1).
    let owner_id = UserId::new();
    let workshop = state.coordinator.create_workshop(body.name, body.seats, None, runtime_type, owner_id).await?;
    Ok((StatusCode::CREATED, Json(workshop_response(&workshop))))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    owner: Option<String>,
}

async fn list_workshops(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<WorkshopResponse>>, ApiError> {
    let workshops = state.coordinator.list_workshops(q.owner.as_deref()).await?;
    Ok(Json(workshops.iter().map(workshop_response).collect()))
}

async fn get_workshop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkshopResponse>, ApiError> {
    let id = WorkshopId::from_string(&id);
    let workshop = state.coordinator.get_workshop(&id).await?.ok_or_else(|| wso_core::CoreError::not_found(id.to_string()))?;
    Ok(Json(workshop_response(&workshop)))
}

async fn start_workshop(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = WorkshopId::from_string(&id);
    state.coordinator.start_workshop(id).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn stop_workshop(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = WorkshopId::from_string(&id);
    state.coordinator.stop_workshop(id).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn delete_workshop(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = WorkshopId::from_string(&id);
    state.coordinator.delete_workshop(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// No authentication: reachable only from the worker host in production
/// (spec.md §6).
async fn register_tunnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TunnelRegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let id = WorkshopId::from_string(&id);
    state.coordinator.register_tunnel_url(&id, body.tunnel_url).await?;
    Ok(StatusCode::OK)
}

async fn redeem_session(
    State(state): State<AppState>,
    Path(access_code): Path<String>,
) -> Result<Json<SessionRedemptionResponse>, ApiError> {
    let mut registration = state
        .store
        .get_registration_by_access_code(&access_code)
        .await?
        .ok_or_else(|| wso_core::CoreError::not_found("unknown access code"))?;

    let workshop = state
        .coordinator
        .get_workshop(&registration.workshop_id)
        .await?
        .ok_or_else(|| wso_core::CoreError::not_found(registration.workshop_id.to_string()))?;

    if workshop.status != WorkshopStatus::Running {
        return Ok(Json(SessionRedemptionResponse::Pending));
    }

    let vm = state.store.get_worker_vm(&registration.workshop_id).await?;
    let Some(vm) = vm else {
        return Ok(Json(SessionRedemptionResponse::Pending));
    };
    let Some(endpoint) = vm.learner_endpoint(workshop.runtime_type) else {
        return Ok(Json(SessionRedemptionResponse::Pending));
    };

    // First redemption against a running workshop assigns the next free
    // seat; later redemptions of the same code reuse it (spec.md §3).
    let seat = match registration.seat_id {
        Some(seat_id) => seat_id,
        None => {
            let seats = state.store.list_seats(&registration.workshop_id).await?;
            let mut free = seats
                .into_iter()
                .find(|s| s.status == wso_core::SeatStatus::Ready)
                .ok_or_else(|| wso_core::CoreError::CapacityExhausted("no free seats".into()))?;
            free.mark_occupied(registration.email.clone());
            state.store.update_seat(free.clone()).await?;
            registration.redeem(free.seat_id);
            state.store.update_registration(registration.clone()).await?;
            free.seat_id
        }
    };
    let token = mint_seat_token(&state.config.workspace_token_secret, &registration.workshop_id, seat)?;

    Ok(Json(SessionRedemptionResponse::Ready {
        endpoint,
        token,
        seat,
        runtime_type: workshop.runtime_type.to_string(),
    }))
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
