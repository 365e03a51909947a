// SPDX-License-Identifier: MIT

//! Worker agent binary: resolves startup configuration from the
//! environment and cloud instance metadata (spec.md §4.4), brings up the
//! bridge device, the MicroVM pool, and the HTTP server, then — unless
//! `DEV_MODE=true` — spawns the tunnel manager and blocks on registration
//! before accepting is considered complete (spec.md §4.7 steps 1, 5).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wso_agent::pool::{MicroVmPool, ProcessVmLauncher};
use wso_agent::tunnel::TunnelManager;
use wso_agent::{env, metadata, AgentConfig, AppState};

const WAIT_FOR_REGISTRATION_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    tracing::info!(version = env::VERSION, "starting wso-agent");

    let http_client = reqwest::Client::new();
    let meta = metadata::resolve(&http_client).await;

    let agent_token = if meta.agent_token.is_empty() { env::agent_token() } else { meta.agent_token.clone() };
    if agent_token.is_empty() {
        tracing::warn!("AGENT_TOKEN is empty: /vms and /info auth is disabled (dev mode)");
    }

    let worker_id = meta.name.clone().or_else(env::worker_id).unwrap_or_else(|| "wso-worker".to_string());
    let bridge_name = env::bridge_name();
    let bridge_ip = env::bridge_ip();

    wso_agent::bridge::ensure_bridge(&bridge_name, &bridge_ip)
        .await
        .map_err(|e| format!("failed to configure bridge {bridge_name}: {e}"))?;

    let launcher = Arc::new(ProcessVmLauncher::new(bridge_name.clone(), env::images_dir(), env::socket_dir()));
    let pool = Arc::new(MicroVmPool::new(bridge_ip.clone(), launcher));

    match pool.reconcile_orphans().await {
        Ok(destroyed) if destroyed > 0 => tracing::info!(destroyed, "destroyed orphaned MicroVM artifacts"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "orphan reconciliation failed, continuing startup"),
    }

    let config = Arc::new(AgentConfig {
        worker_id: worker_id.clone(),
        capacity: env::capacity(),
        bridge_ip,
        agent_token,
    });

    let state = AppState { config, pool, http_client, started_at: Instant::now() };

    let app = wso_agent::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let port = env::port();
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    // Ordering guarantee (spec.md §4.7): the listener must already be
    // accepting before the tunnel URL is captured, so the server is spawned
    // first and the tunnel manager starts afterward.
    let server = tokio::spawn(async move {
        let make_service = app.into_make_service_with_connect_info::<std::net::SocketAddr>();
        if let Err(e) = axum::serve(listener, make_service).with_graceful_shutdown(shutdown_signal()).await {
            tracing::error!(error = %e, "HTTP server exited with error");
        }
    });

    let tunnel = if env::dev_mode() {
        tracing::info!("DEV_MODE=true: tunnel manager not started");
        None
    } else {
        let workshop_id = meta.workshop_id.clone().ok_or("workshop-id is required outside DEV_MODE")?;
        let backend_url = meta.backend_url.clone().ok_or("backend-url is required outside DEV_MODE")?;

        let manager = TunnelManager::spawn(port, backend_url, workshop_id);
        if let Err(e) = manager.wait_for_registration(WAIT_FOR_REGISTRATION_TIMEOUT).await {
            return Err(format!("tunnel registration did not complete: {e}").into());
        }
        tracing::info!(tunnel_url = ?manager.tunnel_url(), "tunnel registered, agent fully up");
        Some(manager)
    };

    server.await?;
    if let Some(manager) = tunnel {
        manager.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
