// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wso-agent: the worker-host binary (spec.md §1, §4.4-§4.7, §6).
//!
//! Composition mirrors `wso-cp`: a small `AppState` carrying the pieces
//! each handler needs, wired once at startup in `main.rs`.

pub mod auth;
pub mod bridge;
pub mod env;
mod http_error;
pub mod metadata;
pub mod pool;
pub mod proxy;
mod routes;
pub mod tunnel;

use std::sync::Arc;
use std::time::Instant;

use pool::MicroVmPool;

/// Runtime configuration resolved once at startup from env + instance
/// metadata (spec.md §4.4 "Startup reads configuration...").
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub worker_id: String,
    pub capacity: usize,
    pub bridge_ip: String,
    pub agent_token: String,
}

/// Shared handler state for both the admission API and the proxy.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub pool: Arc<MicroVmPool>,
    pub http_client: reqwest::Client,
    pub started_at: Instant,
}

impl AppState {
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub use routes::router;
