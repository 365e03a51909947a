// SPDX-License-Identifier: MIT

//! Bearer-token middleware for `/vms/*` and `/info` (spec.md §4.4 "Auth").
//! Short-circuits to a no-op when the configured token is empty (dev mode).
//! `/proxy/*` never passes through this layer; those routes are
//! authenticated by the workspace's own seat token instead.

use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use wso_wire::{codes, ErrorEnvelope};

use crate::AppState;

pub async fn require_bearer_token<B>(State(state): State<AppState>, req: Request<B>, next: Next<B>) -> Response {
    if state.config.agent_token.is_empty() {
        return next.run(req).await;
    }

    let Some(header_value) = req.headers().get(header::AUTHORIZATION) else {
        return unauthorized(codes::MISSING_AUTH, "missing Authorization header");
    };
    let Ok(header_value) = header_value.to_str() else {
        return unauthorized(codes::INVALID_AUTH, "Authorization header is not valid UTF-8");
    };
    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return unauthorized(codes::INVALID_AUTH, "Authorization header is not a bearer token");
    };
    if token != state.config.agent_token {
        return unauthorized(codes::INVALID_TOKEN, "bearer token does not match");
    }

    next.run(req).await
}

fn unauthorized(code: &str, message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorEnvelope::new(message, code))).into_response()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
