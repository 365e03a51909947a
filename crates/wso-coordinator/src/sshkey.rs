// SPDX-License-Identifier: MIT

//! SSH keypair generation bound to a workshop ID (spec.md §4.1 provisioning
//! task, step 1). The public key is injected into the worker-host VM
//! config; the private key is persisted on the `WorkerVm` row (encrypted at
//! rest outside this crate's concern, per spec.md §3).

use ssh_key::rand_core::OsRng;
use ssh_key::{Algorithm, LineEnding, PrivateKey};
use wso_core::{CoreError, WorkshopId};

/// Generate a fresh Ed25519 keypair and return `(public_openssh, private_openssh)`.
pub fn generate_ssh_keypair(workshop_id: &WorkshopId) -> Result<(String, String), CoreError> {
    let mut key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .map_err(|e| CoreError::Internal(format!("ssh keygen failed: {e}")))?;
    key.set_comment(format!("wso-worker-{workshop_id}"));

    let public = key
        .public_key()
        .to_openssh()
        .map_err(|e| CoreError::Internal(format!("ssh public key encode failed: {e}")))?;
    let private = key
        .to_openssh(LineEnding::LF)
        .map_err(|e| CoreError::Internal(format!("ssh private key encode failed: {e}")))?
        .to_string();
    Ok((public, private))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keypair_has_expected_shapes() {
        let (public, private) = generate_ssh_keypair(&WorkshopId::new()).unwrap();
        assert!(public.starts_with("ssh-ed25519 "));
        assert!(private.contains("BEGIN OPENSSH PRIVATE KEY"));
    }

    #[test]
    fn each_call_generates_a_distinct_key() {
        let id = WorkshopId::new();
        let (pub_a, _) = generate_ssh_keypair(&id).unwrap();
        let (pub_b, _) = generate_ssh_keypair(&id).unwrap();
        assert_ne!(pub_a, pub_b);
    }
}
