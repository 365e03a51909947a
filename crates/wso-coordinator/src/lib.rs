// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wso-coordinator: the `WorkshopCoordinator` (spec.md §4.1) — workshop
//! lifecycle, async provisioning/teardown, and the per-workshop
//! serialization invariant (spec.md §8 invariant 2).

mod backends;
mod coordinator;
mod sshkey;
mod tasks;

pub use backends::Backends;
pub use coordinator::{CoordinatorConfig, CoordinatorDeps, WorkshopCoordinator};
pub use sshkey::generate_ssh_keypair;
