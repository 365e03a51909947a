// SPDX-License-Identifier: MIT

//! CP-side internal and learner-facing wire DTOs (spec.md §6).

use serde::{Deserialize, Serialize};

/// Body of `POST /api/internal/workshops/{id}/tunnel`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TunnelRegisterRequest {
    pub tunnel_url: String,
}

/// Response of `GET /api/session/{access_code}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionRedemptionResponse {
    Pending,
    Ready {
        endpoint: String,
        token: String,
        seat: u32,
        runtime_type: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkshopRequest {
    pub name: String,
    pub seats: u32,
    #[serde(default)]
    pub runtime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkshopResponse {
    pub id: String,
    pub name: String,
    pub code: String,
    pub seats: u32,
    pub status: String,
    pub runtime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redemption_pending_serializes_tagged() {
        let resp = SessionRedemptionResponse::Pending;
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn redemption_ready_carries_endpoint_and_token() {
        let resp = SessionRedemptionResponse::Ready {
            endpoint: "https://abcd.tunnel.example".into(),
            token: "jwt".into(),
            seat: 2,
            runtime_type: "docker".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["endpoint"], "https://abcd.tunnel.example");
    }

    #[test]
    fn tunnel_register_request_round_trips() {
        let req = TunnelRegisterRequest { tunnel_url: "https://x.tunnel.example".into() };
        let json = serde_json::to_string(&req).unwrap();
        let back: TunnelRegisterRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }
}
