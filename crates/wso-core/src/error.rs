// SPDX-License-Identifier: MIT

//! Shared domain error taxonomy.
//!
//! Every fallible operation across the coordinator, store, and VM backend
//! ports returns a [`CoreError`]. HTTP layers on both services translate it
//! into the wire error envelope via [`CoreError::code`].

use thiserror::Error;

/// Domain-level error kinds shared by the control plane and worker agent.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("capacity exhausted: {0}")]
    CapacityExhausted(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Machine-readable error token for the wire envelope (see spec.md §6).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_field",
            CoreError::NotFound(_) => "vm_not_found",
            CoreError::Conflict(_) => "vm_exists",
            CoreError::CapacityExhausted(_) => "at_capacity",
            CoreError::UpstreamUnavailable(_) => "create_failed",
            CoreError::Timeout(_) => "create_failed",
            CoreError::PermissionDenied(_) => "invalid_auth",
            CoreError::Internal(_) => "internal",
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::Conflict(msg.into())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
