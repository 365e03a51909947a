// SPDX-License-Identifier: MIT

//! `IntoResponse for CoreError`: the agent's single HTTP status/error-envelope
//! mapping (spec.md §6 wire contract), mirroring `wso_cp::http_error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use wso_core::CoreError;
use wso_wire::ErrorEnvelope;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::CapacityExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CoreError::PermissionDenied(_) => StatusCode::UNAUTHORIZED,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorEnvelope::from(&self.0))).into_response()
    }
}

#[cfg(test)]
#[path = "http_error_tests.rs"]
mod tests;
