// SPDX-License-Identifier: MIT

//! `/proxy/{ws}/{seat}/files[/…]` (spec.md §4.6 "HTTP proxy"): a reverse
//! proxy to the MicroVM's files port with path rewriting and
//! `X-Forwarded-*` headers, built the same way `wso_vmbackend::cloud`
//! drives `reqwest` for cloud calls — a dedicated client with a narrow
//! timeout budget rather than the shared default client.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http_error::ApiError;
use crate::AppState;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const TLS_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE: Duration = Duration::from_secs(30);
const MAX_IDLE_PER_HOST: usize = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

static PROXY_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn proxy_client() -> &'static reqwest::Client {
    PROXY_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(DIAL_TIMEOUT)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .tcp_keepalive(KEEPALIVE)
            .timeout(TLS_TIMEOUT + DIAL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Strip `/proxy/{ws}/{seat}` from the inbound path; an empty remainder
/// becomes `/files` (spec.md §4.6 "HTTP proxy" step 2).
fn rewrite_path<'a>(inbound: &'a str, workshop_id: &str, seat_id: u32) -> &'a str {
    let prefix = format!("/proxy/{workshop_id}/{seat_id}");
    match inbound.strip_prefix(prefix.as_str()) {
        Some("") | None => "/files",
        Some(rest) => rest,
    }
}

pub async fn files(
    State(state): State<AppState>,
    Path((workshop_id, seat_id)): Path<(String, u32)>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    uri: OriginalUri,
    body: Bytes,
) -> Response {
    let vm_ip = match super::resolve_vm_ip(&state, &workshop_id, seat_id) {
        Ok(ip) => ip,
        Err(e) => return ApiError(e).into_response(),
    };

    let path = rewrite_path(uri.0.path(), &workshop_id, seat_id);
    let query = uri.0.query().map(|q| format!("?{q}")).unwrap_or_default();
    let target = format!("http://{vm_ip}:{}{path}{query}", super::FILES_PORT);

    let mut request = proxy_client().request(method, &target);
    for (name, value) in headers.iter() {
        if name == axum::http::header::HOST {
            continue;
        }
        request = request.header(name, value);
    }
    request = request
        .header("X-Forwarded-For", remote.ip().to_string())
        .header("X-Forwarded-Proto", "http");
    if let Some(host) = headers.get(axum::http::header::HOST) {
        request = request.header("X-Forwarded-Host", host);
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    match request.send().await {
        Ok(resp) => {
            let status = resp.status();
            let mut out = Response::builder().status(status);
            for (name, value) in resp.headers().iter() {
                out = out.header(name, value);
            }
            let body = resp.bytes().await.unwrap_or_default();
            out.body(axum::body::Body::from(body)).unwrap_or_else(|_| {
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to build proxied response").into_response()
            })
        }
        Err(e) => (StatusCode::BAD_GATEWAY, format!("upstream unavailable: {e}")).into_response(),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
