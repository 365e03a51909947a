// SPDX-License-Identifier: MIT

//! TunnelManager (spec.md §4.7): spawns the external tunneling subprocess,
//! captures its public URL, and registers that URL with the control plane.
//!
//! Both output streams are piped (`Stdio::piped()`), a reaper task waits on
//! the child so it never zombies, and the exit status is logged
//! structurally.

mod capture;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Child;
use tokio::sync::Notify;
use tracing::{error, info, warn};

const URL_CAPTURE_DEADLINE: Duration = Duration::from_secs(60);
const REGISTER_ATTEMPTS: u32 = 5;
const REGISTER_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("tunnel process failed to start: {0}")]
    SpawnFailed(String),
    #[error("no tunnel URL captured within the deadline")]
    NoUrlCaptured,
    #[error("tunnel registration with the control plane failed: {0}")]
    RegistrationFailed(String),
    #[error("waiting for tunnel registration timed out")]
    WaitTimedOut,
}

#[derive(Default)]
struct State {
    tunnel_url: Option<String>,
    registered: bool,
    failure: Option<String>,
    finished: bool,
}

/// Owns the tunnel subprocess and the registration handshake with the CP
/// (spec.md §9 "Global mutable state": exactly one TunnelManager per agent).
pub struct TunnelManager {
    state: Mutex<State>,
    done: Notify,
    child: Mutex<Option<Child>>,
    stopped: Mutex<bool>,
}

impl TunnelManager {
    /// Spawn the tunnel subprocess and start the capture/registration
    /// pipeline in the background. Returns immediately; callers block on
    /// [`TunnelManager::wait_for_registration`] separately (spec.md §4.7
    /// step 5, "Ordering guarantee").
    pub fn spawn(local_port: u16, backend_url: String, workshop_id: String) -> Arc<Self> {
        let manager = Arc::new(Self {
            state: Mutex::new(State::default()),
            done: Notify::new(),
            child: Mutex::new(None),
            stopped: Mutex::new(false),
        });

        let task_manager = manager.clone();
        tokio::spawn(async move {
            task_manager.run(local_port, backend_url, workshop_id).await;
        });

        manager
    }

    async fn run(self: Arc<Self>, local_port: u16, backend_url: String, workshop_id: String) {
        let tunnel_bin = crate::env::tunnel_bin();
        let mut cmd = tokio::process::Command::new(&tunnel_bin);
        cmd.arg("tunnel")
            .arg("--url")
            .arg(format!("http://localhost:{local_port}"))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                self.fail(format!("failed to spawn {tunnel_bin}: {e}"));
                return;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        *self.child.lock() = Some(child);

        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            self.fail("tunnel subprocess did not expose piped stdout/stderr".into());
            return;
        };

        let pattern = capture::url_pattern(&crate::env::tunnel_host());
        let url = match capture::wait_for_url(stdout, stderr, &pattern, URL_CAPTURE_DEADLINE).await {
            Some(url) => url,
            None => {
                warn!(workshop_id, "no tunnel URL captured within the capture deadline");
                self.fail(TunnelError::NoUrlCaptured.to_string());
                return;
            }
        };

        info!(workshop_id, tunnel_url = %url, "tunnel URL captured");
        self.state.lock().tunnel_url = Some(url.clone());

        match register(&backend_url, &workshop_id, &url).await {
            Ok(()) => {
                info!(workshop_id, "tunnel registered with control plane");
                self.succeed();
            }
            Err(e) => {
                error!(workshop_id, error = %e, "tunnel registration failed permanently");
                self.fail(e);
            }
        }
    }

    #[cfg(test)]
    fn new_for_test() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(State::default()), done: Notify::new(), child: Mutex::new(None), stopped: Mutex::new(false) })
    }

    fn succeed(&self) {
        let mut state = self.state.lock();
        if state.finished {
            return;
        }
        state.registered = true;
        state.finished = true;
        drop(state);
        self.done.notify_waiters();
    }

    fn fail(&self, reason: String) {
        let mut state = self.state.lock();
        if state.finished {
            return;
        }
        state.failure = Some(reason);
        state.finished = true;
        drop(state);
        self.done.notify_waiters();
    }

    pub fn tunnel_url(&self) -> Option<String> {
        self.state.lock().tunnel_url.clone()
    }

    pub fn is_registered(&self) -> bool {
        self.state.lock().registered
    }

    /// Block until the registration signal closes (success or failure) or
    /// `timeout` elapses (spec.md §4.7 step 5, default 2 minutes).
    pub async fn wait_for_registration(&self, timeout: Duration) -> Result<(), TunnelError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let state = self.state.lock();
                if state.finished {
                    return match &state.failure {
                        None => Ok(()),
                        Some(reason) => Err(TunnelError::RegistrationFailed(reason.clone())),
                    };
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(TunnelError::WaitTimedOut);
            }
            // `notify_waiters` wakes only registrants at the moment it
            // fires; a `fail`/`succeed` landing between the check above and
            // this call would otherwise be lost. Loop back to re-check
            // `state.finished` unconditionally instead of trusting the
            // timeout result, so a missed wakeup just costs one extra loop.
            let _ = tokio::time::timeout(remaining, self.done.notified()).await;
        }
    }

    /// Cancel the tunnel process and close the signal channel. Idempotent
    /// (spec.md §4.7 step 6).
    pub async fn stop(&self) {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return;
        }
        *stopped = true;
        drop(stopped);

        if let Some(mut child) = self.child.lock().take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        self.fail("tunnel manager stopped".into());
    }
}

async fn register(backend_url: &str, workshop_id: &str, tunnel_url: &str) -> Result<(), String> {
    let url = format!("{backend_url}/api/internal/workshops/{workshop_id}/tunnel");
    let client = reqwest::Client::new();
    let body = serde_json::json!({ "tunnel_url": tunnel_url });

    let mut last_error = String::new();
    for attempt in 1..=REGISTER_ATTEMPTS {
        match client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => last_error = format!("control plane returned {}", resp.status()),
            Err(e) => last_error = e.to_string(),
        }
        if attempt < REGISTER_ATTEMPTS {
            warn!(attempt, error = %last_error, "tunnel registration attempt failed, retrying");
            tokio::time::sleep(REGISTER_BACKOFF).await;
        }
    }
    Err(format!("all {REGISTER_ATTEMPTS} registration attempts failed: {last_error}"))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
