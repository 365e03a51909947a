// SPDX-License-Identifier: MIT

//! Error envelope shared by every Agent and CP HTTP endpoint (spec.md §6).

use serde::{Deserialize, Serialize};
use wso_core::CoreError;

/// `{error:<message>, code:<machine-token>, details?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self { error: error.into(), code: code.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&CoreError> for ErrorEnvelope {
    fn from(err: &CoreError) -> Self {
        ErrorEnvelope::new(err.to_string(), err.code())
    }
}

impl From<CoreError> for ErrorEnvelope {
    fn from(err: CoreError) -> Self {
        ErrorEnvelope::from(&err)
    }
}

/// Machine-readable error tokens enumerated in spec.md §6.
pub mod codes {
    pub const INVALID_JSON: &str = "invalid_json";
    pub const MISSING_FIELD: &str = "missing_field";
    pub const INVALID_FIELD: &str = "invalid_field";
    pub const INVALID_SEAT_ID: &str = "invalid_seat_id";
    pub const VM_EXISTS: &str = "vm_exists";
    pub const AT_CAPACITY: &str = "at_capacity";
    pub const CREATE_FAILED: &str = "create_failed";
    pub const VM_NOT_FOUND: &str = "vm_not_found";
    pub const LIST_FAILED: &str = "list_failed";
    pub const GET_FAILED: &str = "get_failed";
    pub const DESTROY_FAILED: &str = "destroy_failed";
    pub const MISSING_AUTH: &str = "missing_auth";
    pub const INVALID_AUTH: &str = "invalid_auth";
    pub const INVALID_TOKEN: &str = "invalid_token";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_without_details_omits_field() {
        let env = ErrorEnvelope::new("seat_id must be positive", codes::INVALID_FIELD);
        let json = serde_json::to_value(&env).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn envelope_round_trips() {
        let env = ErrorEnvelope::new("boom", codes::CREATE_FAILED).with_details("stack: ...");
        let json = serde_json::to_string(&env).unwrap();
        let back: ErrorEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env, back);
    }

    #[test]
    fn core_error_converts_to_matching_code() {
        let env: ErrorEnvelope = CoreError::conflict("vm already exists").into();
        assert_eq!(env.code, codes::VM_EXISTS);
    }
}
