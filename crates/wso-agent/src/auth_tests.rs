// SPDX-License-Identifier: MIT

use super::*;
use axum::body::{to_bytes, Body};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

use crate::pool::{MicroVmPool, MockVmLauncher};
use crate::AgentConfig;

fn harness(agent_token: &str) -> Router {
    let state = AppState {
        config: Arc::new(AgentConfig {
            worker_id: "wkr-test".into(),
            capacity: 50,
            bridge_ip: "192.168.100.1/24".into(),
            agent_token: agent_token.into(),
        }),
        pool: Arc::new(MicroVmPool::new("192.168.100.1/24", Arc::new(MockVmLauncher::new()))),
        http_client: reqwest::Client::new(),
        started_at: Instant::now(),
    };
    Router::new()
        .route("/protected", get(|| async { "ok" }))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .with_state(state)
}

async fn error_code(resp: Response) -> String {
    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    let env: ErrorEnvelope = serde_json::from_slice(&body).expect("parse error envelope");
    env.code
}

#[tokio::test]
async fn missing_header_is_missing_auth() {
    let app = harness("secret-token");
    let resp = app.oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, codes::MISSING_AUTH);
}

#[tokio::test]
async fn non_bearer_scheme_is_invalid_auth() {
    let app = harness("secret-token");
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("authorization", "Basic secret-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, codes::INVALID_AUTH);
}

#[tokio::test]
async fn wrong_token_is_invalid_token() {
    let app = harness("secret-token");
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, codes::INVALID_TOKEN);
}

#[tokio::test]
async fn matching_token_passes_through() {
    let app = harness("secret-token");
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .header("authorization", "Bearer secret-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_configured_token_disables_auth_entirely() {
    let app = harness("");
    let resp = app.oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
