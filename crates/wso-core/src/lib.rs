// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wso-core: domain model shared by the control plane and worker agent.
//!
//! Entities, IDs, and the error taxonomy described in spec.md §3 and §7.
//! Nothing here talks to HTTP, a database, or a cloud API — those are the
//! concern of `wso-wire`, `wso-store`, and `wso-vmbackend` respectively.

pub mod macros;

pub mod clock;
pub mod error;
pub mod id;
pub mod registration;
pub mod seat;
pub mod user;
pub mod worker_vm;
pub mod workshop;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::CoreError;
pub use registration::{generate_access_code, generate_workshop_code, Registration, RegistrationId, RegistrationStatus};
pub use seat::{Seat, SeatKey, SeatStatus};
pub use user::User;
pub use worker_vm::{VmRecordId, WorkerVm, WorkerVmStatus};
pub use workshop::{RuntimeType, UserId, Workshop, WorkshopId, WorkshopStatus};
