// SPDX-License-Identifier: MIT

//! `VmLauncher`: the side-effecting half of MicroVM lifecycle — tap
//! interface, on-disk artifact directory, and the guest process itself
//! (spec.md §4.5 "Isolation", "Failure"). Kept behind a trait so
//! [`super::MicroVmPool`] stays unit-testable without a real kernel/rootfs
//! pair (image construction is out of scope, spec.md §1).
//!
//! [`ProcessVmLauncher`] shells out to the host's VM tooling one
//! `tokio::process::Command` per step; real failures bubble up as
//! [`CoreError::UpstreamUnavailable`].

use super::CreateSpec;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use wso_core::CoreError;

#[async_trait]
pub trait VmLauncher: Send + Sync {
    /// Boot one MicroVM for `(workshop_id, seat_id)` at `ip`. On error, the
    /// implementation must have already rolled back any side effect it
    /// created before returning (spec.md §4.5 "Failure").
    async fn boot(&self, workshop_id: &str, seat_id: u32, ip: &str, spec: &CreateSpec) -> Result<(), CoreError>;

    /// Tear down the MicroVM for `(workshop_id, seat_id)`: kill the process,
    /// remove the tap interface, remove the on-disk artifact directory.
    async fn teardown(&self, workshop_id: &str, seat_id: u32) -> Result<(), CoreError>;

    /// Destroy on-disk artifacts with no corresponding pool entry, logging
    /// each one (spec.md §4.5, §9 Open Question (a)). Returns the count
    /// destroyed.
    async fn destroy_all_orphans(&self) -> Result<usize, CoreError>;
}

fn tap_name(workshop_id: &str, seat_id: u32) -> String {
    // Linux interface names cap at 15 bytes; keep this short and
    // collision-resistant by seat_id alone within a workshop's own tap
    // namespace is not enough across workshops, so fold in a short hash of
    // the workshop id.
    let mut hash: u32 = 2166136261;
    for b in workshop_id.as_bytes() {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    format!("wsotap{:06x}{seat_id}", hash & 0xffffff)
}

/// Real launcher: creates a tap device on the shared bridge, allocates a
/// per-seat directory under `images_dir`/`socket_dir`, and spawns the guest
/// process. The guest binary itself (firecracker/qemu invocation, kernel
/// and rootfs paths) is resolved from `VM_RUNNER` so deployments can point
/// at whatever launcher binary their image-build pipeline produces —
/// constructing that image is explicitly out of scope (spec.md §1, §4.5).
pub struct ProcessVmLauncher {
    bridge_name: String,
    images_dir: PathBuf,
    socket_dir: PathBuf,
    runner_bin: String,
    children: Mutex<std::collections::HashMap<(String, u32), tokio::process::Child>>,
}

impl ProcessVmLauncher {
    pub fn new(bridge_name: impl Into<String>, images_dir: PathBuf, socket_dir: PathBuf) -> Self {
        Self {
            bridge_name: bridge_name.into(),
            images_dir,
            socket_dir,
            runner_bin: std::env::var("VM_RUNNER").unwrap_or_else(|_| "firecracker".into()),
            children: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn seat_dir(&self, workshop_id: &str, seat_id: u32) -> PathBuf {
        self.images_dir.join(workshop_id).join(seat_id.to_string())
    }

    async fn run(cmd: &str, args: &[&str]) -> Result<(), String> {
        let output = tokio::process::Command::new(cmd)
            .args(args)
            .output()
            .await
            .map_err(|e| format!("failed to exec {cmd}: {e}"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

#[async_trait]
impl VmLauncher for ProcessVmLauncher {
    async fn boot(&self, workshop_id: &str, seat_id: u32, ip: &str, spec: &CreateSpec) -> Result<(), CoreError> {
        let tap = tap_name(workshop_id, seat_id);
        let seat_dir = self.seat_dir(workshop_id, seat_id);

        Self::run("ip", &["tuntap", "add", "dev", &tap, "mode", "tap"])
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("tap create failed: {e}")))?;
        if let Err(e) = Self::run("ip", &["link", "set", &tap, "master", &self.bridge_name]).await {
            let _ = Self::run("ip", &["link", "delete", &tap]).await;
            return Err(CoreError::UpstreamUnavailable(format!("tap attach to bridge failed: {e}")));
        }
        if let Err(e) = Self::run("ip", &["link", "set", &tap, "up"]).await {
            let _ = Self::run("ip", &["link", "delete", &tap]).await;
            return Err(CoreError::UpstreamUnavailable(format!("tap up failed: {e}")));
        }

        if let Err(e) = tokio::fs::create_dir_all(&seat_dir).await {
            let _ = Self::run("ip", &["link", "delete", &tap]).await;
            return Err(CoreError::UpstreamUnavailable(format!("seat artifact dir create failed: {e}")));
        }

        let socket_path = self.socket_dir.join(format!("{workshop_id}-{seat_id}.sock"));
        let vcpus = spec.vcpus.unwrap_or(2).to_string();
        let memory_mb = spec.memory_mb.unwrap_or(1024).to_string();

        let spawn_result = tokio::process::Command::new(&self.runner_bin)
            .arg("--api-sock")
            .arg(&socket_path)
            .arg("--tap-device")
            .arg(&tap)
            .arg("--guest-ip")
            .arg(ip)
            .arg("--vcpus")
            .arg(&vcpus)
            .arg("--mem-mb")
            .arg(&memory_mb)
            .arg("--chroot-base")
            .arg(&seat_dir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn();

        let child = match spawn_result {
            Ok(c) => c,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&seat_dir).await;
                let _ = Self::run("ip", &["link", "delete", &tap]).await;
                return Err(CoreError::UpstreamUnavailable(format!("vm runner spawn failed: {e}")));
            }
        };

        self.children.lock().insert((workshop_id.to_string(), seat_id), child);
        info!(workshop_id, seat_id, ip, tap = %tap, "microvm booted");
        Ok(())
    }

    async fn teardown(&self, workshop_id: &str, seat_id: u32) -> Result<(), CoreError> {
        let tap = tap_name(workshop_id, seat_id);
        let seat_dir = self.seat_dir(workshop_id, seat_id);

        if let Some(mut child) = self.children.lock().remove(&(workshop_id.to_string(), seat_id)) {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        if let Err(e) = Self::run("ip", &["link", "delete", &tap]).await {
            warn!(workshop_id, seat_id, error = %e, "tap delete failed during teardown, continuing");
        }
        if let Err(e) = tokio::fs::remove_dir_all(&seat_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(workshop_id, seat_id, error = %e, "seat artifact cleanup failed during teardown");
            }
        }
        Ok(())
    }

    async fn destroy_all_orphans(&self) -> Result<usize, CoreError> {
        let mut destroyed = 0usize;
        let mut entries = match tokio::fs::read_dir(&self.images_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CoreError::Internal(format!("orphan scan failed: {e}"))),
        };
        let live: HashSet<(String, u32)> = self.children.lock().keys().cloned().collect();
        while let Ok(Some(workshop_entry)) = entries.next_entry().await {
            let Ok(file_type) = workshop_entry.file_type().await else { continue };
            if !file_type.is_dir() {
                continue;
            }
            let workshop_id = workshop_entry.file_name().to_string_lossy().to_string();
            let Ok(mut seat_entries) = tokio::fs::read_dir(workshop_entry.path()).await else { continue };
            while let Ok(Some(seat_entry)) = seat_entries.next_entry().await {
                let Some(seat_id) = seat_entry.file_name().to_string_lossy().parse::<u32>().ok() else { continue };
                if live.contains(&(workshop_id.clone(), seat_id)) {
                    continue;
                }
                warn!(workshop_id = %workshop_id, seat_id, "destroying orphaned microvm artifact");
                if tokio::fs::remove_dir_all(seat_entry.path()).await.is_ok() {
                    destroyed += 1;
                }
            }
        }
        Ok(destroyed)
    }
}

/// In-memory launcher for pool unit tests: no processes, no network
/// namespace manipulation. Optionally forced to fail to exercise the
/// rollback path (spec.md §4.5 "Failure").
#[derive(Clone, Default)]
pub struct MockVmLauncher {
    booted: Arc<Mutex<HashSet<(String, u32)>>>,
    fail_boot: Arc<std::sync::atomic::AtomicBool>,
    boot_calls: Arc<AtomicUsize>,
}

impl MockVmLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_boot(&self, fail: bool) {
        self.fail_boot.store(fail, Ordering::SeqCst);
    }

    pub fn boot_calls(&self) -> usize {
        self.boot_calls.load(Ordering::SeqCst)
    }

    pub fn is_booted(&self, workshop_id: &str, seat_id: u32) -> bool {
        self.booted.lock().contains(&(workshop_id.to_string(), seat_id))
    }
}

#[async_trait]
impl VmLauncher for MockVmLauncher {
    async fn boot(&self, workshop_id: &str, seat_id: u32, _ip: &str, _spec: &CreateSpec) -> Result<(), CoreError> {
        self.boot_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_boot.load(Ordering::SeqCst) {
            return Err(CoreError::UpstreamUnavailable("mock: boot forced failure".into()));
        }
        self.booted.lock().insert((workshop_id.to_string(), seat_id));
        Ok(())
    }

    async fn teardown(&self, workshop_id: &str, seat_id: u32) -> Result<(), CoreError> {
        self.booted.lock().remove(&(workshop_id.to_string(), seat_id));
        Ok(())
    }

    async fn destroy_all_orphans(&self) -> Result<usize, CoreError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_name_stays_within_linux_interface_name_limit() {
        let name = tap_name("wsh-aVeryLongWorkshopIdentifier123456", 7);
        assert!(name.len() <= 15, "{name} is {} bytes", name.len());
    }

    #[test]
    fn tap_name_differs_across_workshops_for_the_same_seat() {
        let a = tap_name("wsh-aaaaaaaaaaaaaaaaaaaaa", 1);
        let b = tap_name("wsh-bbbbbbbbbbbbbbbbbbbbb", 1);
        assert_ne!(a, b);
    }
}
