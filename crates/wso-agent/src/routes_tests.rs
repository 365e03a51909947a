// SPDX-License-Identifier: MIT

use super::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

use crate::pool::{MicroVmPool, MockVmLauncher};
use crate::AgentConfig;

fn harness(capacity: usize, agent_token: &str) -> AppState {
    let pool = MicroVmPool::new("192.168.100.1/24", Arc::new(MockVmLauncher::new()));
    AppState {
        config: Arc::new(AgentConfig {
            worker_id: "wkr-test".into(),
            capacity,
            bridge_ip: "192.168.100.1/24".into(),
            agent_token: agent_token.into(),
        }),
        pool: Arc::new(pool),
        http_client: reqwest::Client::new(),
        started_at: Instant::now(),
    }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("build request")
}

#[tokio::test]
async fn health_is_reachable_without_auth() {
    let state = harness(50, "secret-token");
    let app = router(state);
    let resp = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn info_without_bearer_token_is_401() {
    let state = harness(50, "secret-token");
    let app = router(state);
    let resp = app.oneshot(Request::builder().uri("/info").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn info_with_correct_bearer_token_succeeds() {
    let state = harness(50, "secret-token");
    let app = router(state);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/info")
                .header("authorization", "Bearer secret-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_agent_token_disables_auth() {
    let state = harness(50, "");
    let app = router(state);
    let resp = app.oneshot(Request::builder().uri("/info").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_vm_with_zero_seat_id_is_400() {
    let state = harness(50, "");
    let app = router(state);
    let body = serde_json::json!({ "workshop_id": "wsh-1", "seat_id": 0 });
    let resp = app.oneshot(json_request("POST", "/vms", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_vm_then_duplicate_is_409() {
    let state = harness(50, "");
    let app = router(state);
    let body = serde_json::json!({ "workshop_id": "wsh-1", "seat_id": 1 });

    let first = app.clone().oneshot(json_request("POST", "/vms", body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.oneshot(json_request("POST", "/vms", body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_vm_at_capacity_is_503() {
    let state = harness(1, "");
    let app = router(state);
    let first = serde_json::json!({ "workshop_id": "wsh-1", "seat_id": 1 });
    let second = serde_json::json!({ "workshop_id": "wsh-1", "seat_id": 2 });

    let resp1 = app.clone().oneshot(json_request("POST", "/vms", first)).await.unwrap();
    assert_eq!(resp1.status(), StatusCode::CREATED);

    let resp2 = app.oneshot(json_request("POST", "/vms", second)).await.unwrap();
    assert_eq!(resp2.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn create_get_delete_get_round_trips_through_the_expected_statuses() {
    let state = harness(50, "");
    let app = router(state);
    let body = serde_json::json!({ "workshop_id": "wsh-1", "seat_id": 1 });

    let created = app.clone().oneshot(json_request("POST", "/vms", body)).await.unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let got = app
        .clone()
        .oneshot(Request::builder().uri("/vms/wsh-1/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(got.status(), StatusCode::OK);

    let deleted = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri("/vms/wsh-1/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = app
        .oneshot(Request::builder().uri("/vms/wsh-1/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn terminal_proxy_against_an_unknown_vm_is_404_without_upgrading() {
    let state = harness(50, "");
    let app = router(state);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/proxy/wsh-1/1/terminal")
                .header("connection", "Upgrade")
                .header("upgrade", "websocket")
                .header("sec-websocket-version", "13")
                .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
