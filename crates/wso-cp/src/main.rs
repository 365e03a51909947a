// SPDX-License-Identifier: MIT

//! Control plane binary: wires the coordinator, the Postgres store, and the
//! configured `VmBackend` adapters, then serves the HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wso_coordinator::{Backends, CoordinatorConfig, CoordinatorDeps, WorkshopCoordinator};
use wso_cp::{env, AppState, CpConfig};
use wso_store::{PostgresStore, Store};
use wso_vmbackend::{CloudVmBackend, FirecrackerVmBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    tracing::info!(version = env::VERSION, "starting wso-cp");

    let database_url = env::database_url().ok_or("DATABASE_URL must be set")?;
    let store: Arc<dyn Store> = Arc::new(PostgresStore::connect(&database_url).await?);

    let compute_base_url = env::gcp_registry().unwrap_or_default();
    let mut backends = Backends::default();
    if !compute_base_url.is_empty() {
        backends.docker = Some(Arc::new(CloudVmBackend::new(reqwest::Client::new(), compute_base_url.clone())));
    }
    if let (Some(snapshot), Some(token)) = (env::fc_snapshot_name(), env::fc_agent_token()) {
        let inner = CloudVmBackend::new(reqwest::Client::new(), compute_base_url);
        backends.firecracker = Some(Arc::new(FirecrackerVmBackend::new(inner, snapshot, token)));
    }

    let coordinator_config = CoordinatorConfig {
        zone: env::gcp_zone(),
        use_spot: env::gcp_use_spot(),
        backend_url: env::backend_url(),
        workspace_token_secret: env::workspace_token_secret(),
        docker_agent_token: env::fc_agent_token().unwrap_or_default(),
        ..CoordinatorConfig::default()
    };
    let coordinator = WorkshopCoordinator::new(CoordinatorDeps { store: store.clone(), backends }, coordinator_config);

    let config = Arc::new(CpConfig {
        workspace_token_secret: env::workspace_token_secret(),
        cors_origins: env::cors_origins(),
    });

    let state = AppState { coordinator: coordinator.clone(), store, config: config.clone() };

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<axum::http::HeaderValue> =
            config.cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let app = wso_cp::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors);

    let addr = format!("0.0.0.0:{}", env::port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(coordinator))
        .await?;

    Ok(())
}

async fn shutdown_signal(coordinator: Arc<WorkshopCoordinator>) {
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

    tracing::info!("shutdown signal received, draining in-flight coordinator tasks");
    coordinator.shutdown();
}
