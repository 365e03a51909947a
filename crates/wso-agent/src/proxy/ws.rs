// SPDX-License-Identifier: MIT

//! `/proxy/{ws}/{seat}/terminal` (spec.md §4.6 "WebSocket proxy").
//!
//! Forwards opaquely: message type and payload are preserved across the
//! axum <-> tokio-tungstenite boundary, since a terminal session carries
//! binary-capable protocols end to end and must not be coerced to text.

use std::time::Duration;

use axum::extract::ws::{CloseFrame as AxumCloseFrame, Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as TungCloseFrame;
use tokio_tungstenite::tungstenite::Message as TungMessage;
use tracing::{debug, warn};

use crate::http_error::ApiError;
use crate::AppState;

const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(10);
const READ_IDLE: Duration = Duration::from_secs(60);
const KEEPALIVE: Duration = Duration::from_millis((READ_IDLE.as_millis() * 9 / 10) as u64);

pub async fn terminal(
    State(state): State<AppState>,
    Path((workshop_id, seat_id)): Path<(String, u32)>,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Response {
    let vm_ip = match super::resolve_vm_ip(&state, &workshop_id, seat_id) {
        Ok(ip) => ip,
        Err(e) => return ApiError(e).into_response(),
    };
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(String::from);

    // Permissive origin: the tunnel in front of this agent enforces HTTPS
    // (spec.md §4.6 step 2).
    upgrade.on_upgrade(move |socket| async move {
        if let Err(e) = bridge(socket, &vm_ip, auth.as_deref()).await {
            warn!(workshop_id, seat_id, vm_ip, error = %e, "terminal proxy session ended with error");
        }
    })
}

async fn bridge(client: WebSocket, vm_ip: &str, auth: Option<&str>) -> Result<(), String> {
    let url = format!("ws://{vm_ip}:{}/terminal", super::TERMINAL_PORT);
    let mut request = url
        .clone()
        .into_client_request()
        .map_err(|e| format!("building backend handshake request: {e}"))?;
    if let Some(token) = auth {
        let value = token.parse().map_err(|_| "invalid auth header".to_string())?;
        request.headers_mut().insert(header::AUTHORIZATION, value);
    }

    let (backend, _resp) = tokio::time::timeout(HANDSHAKE_DEADLINE, tokio_tungstenite::connect_async(request))
        .await
        .map_err(|_| "backend handshake timed out".to_string())?
        .map_err(|e| format!("backend handshake failed: {e}"))?;

    let (mut client_tx, mut client_rx) = client.split();
    let (mut backend_tx, mut backend_rx) = backend.split();

    let client_to_backend = async {
        loop {
            match tokio::time::timeout(KEEPALIVE, client_rx.next()).await {
                Ok(Some(Ok(msg))) => {
                    if matches!(msg, AxumMessage::Close(_)) {
                        let _ = backend_tx.send(to_tungstenite(msg)).await;
                        return Ok(());
                    }
                    if backend_tx.send(to_tungstenite(msg)).await.is_err() {
                        return Err("backend send failed".to_string());
                    }
                }
                Ok(Some(Err(e))) => return Err(format!("client recv error: {e}")),
                Ok(None) => return Ok(()),
                Err(_) => {
                    if backend_tx.send(TungMessage::Ping(Vec::new().into())).await.is_err() {
                        return Err("keepalive ping failed".to_string());
                    }
                }
            }
        }
    };

    let backend_to_client = async {
        loop {
            match tokio::time::timeout(KEEPALIVE, backend_rx.next()).await {
                Ok(Some(Ok(msg))) => {
                    let closing = matches!(msg, TungMessage::Close(_));
                    if client_tx.send(to_axum(msg)).await.is_err() {
                        return Err("client send failed".to_string());
                    }
                    if closing {
                        return Ok(());
                    }
                }
                Ok(Some(Err(e))) => return Err(format!("backend recv error: {e}")),
                Ok(None) => return Ok(()),
                Err(_) => {
                    debug!(vm_ip, "backend read idle, sending keepalive pong");
                    if client_tx.send(AxumMessage::Pong(Vec::new())).await.is_err() {
                        return Err("keepalive pong failed".to_string());
                    }
                }
            }
        }
    };

    tokio::select! {
        r = client_to_backend => r,
        r = backend_to_client => r,
    }
}

fn to_tungstenite(msg: AxumMessage) -> TungMessage {
    match msg {
        AxumMessage::Text(t) => TungMessage::Text(t.into()),
        AxumMessage::Binary(b) => TungMessage::Binary(b.into()),
        AxumMessage::Ping(b) => TungMessage::Ping(b.into()),
        AxumMessage::Pong(b) => TungMessage::Pong(b.into()),
        AxumMessage::Close(frame) => TungMessage::Close(frame.map(|f| TungCloseFrame {
            code: f.code.into(),
            reason: f.reason.to_string().into(),
        })),
    }
}

fn to_axum(msg: TungMessage) -> AxumMessage {
    match msg {
        TungMessage::Text(t) => AxumMessage::Text(t.to_string()),
        TungMessage::Binary(b) => AxumMessage::Binary(b.to_vec()),
        TungMessage::Ping(b) => AxumMessage::Ping(b.to_vec()),
        TungMessage::Pong(b) => AxumMessage::Pong(b.to_vec()),
        TungMessage::Close(frame) => AxumMessage::Close(frame.map(|f| AxumCloseFrame {
            code: f.code.into(),
            reason: f.reason.to_string().into(),
        })),
        TungMessage::Frame(_) => AxumMessage::Binary(Vec::new()),
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
