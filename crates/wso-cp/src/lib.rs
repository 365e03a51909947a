// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wso-cp: the control plane HTTP service (spec.md §1, §4.1, §6).

pub mod env;
mod http_error;
mod routes;
mod seat_token;

use std::sync::Arc;

use wso_coordinator::WorkshopCoordinator;
use wso_store::Store;

/// Runtime configuration read once at startup (SPEC_FULL.md §2 `env` module
/// addition).
#[derive(Debug, Clone)]
pub struct CpConfig {
    pub workspace_token_secret: String,
    pub cors_origins: Vec<String>,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<WorkshopCoordinator>,
    pub store: Arc<dyn Store>,
    pub config: Arc<CpConfig>,
}

pub use routes::router;
