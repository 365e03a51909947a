// SPDX-License-Identifier: MIT

//! User: an instructor or admin who owns workshops.
//!
//! Password hashing and session JWTs are out of scope (spec.md §1) — this
//! crate only carries the identity row the coordinator needs for ownership
//! checks in `ListWorkshops(owner?, admin?)`.

use crate::workshop::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub is_admin: bool,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self { id: UserId::new(), email: email.into(), is_admin: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_not_admin() {
        let u = User::new("ada@example.com");
        assert!(!u.is_admin);
    }
}
