// SPDX-License-Identifier: MIT

//! Cloud `VmBackend`: drives a generic compute-instance REST API over
//! `reqwest` (spec.md §4.1 step 2, §4.2). The API shape is intentionally
//! provider-agnostic — create/get/delete/list on an `instances` collection,
//! filtered by the `LABEL_SYSTEM` label this crate attaches to everything it
//! creates — so a concrete provider can sit behind `base_url` without this
//! adapter changing.

use crate::port::{seat_ports, vm_name, VmBackend, VmConfig, VmInstance, VmStatus, LABEL_SYSTEM};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use wso_core::{CoreError, WorkshopId};

/// Boot-time instance metadata keys (spec.md §4.1 step 2 items a-e): the
/// worker agent reads these on first boot to self-register with the CP.
pub mod metadata_keys {
    pub const WORKER_AGENT_TOKEN: &str = "worker-agent-token";
    pub const BACKEND_URL: &str = "backend-url";
    pub const WORKSHOP_TOKEN_SECRET: &str = "workspace-token-secret";
    pub const WORKSHOP_ID: &str = "workshop-id";
    pub const RUNTIME_TYPE: &str = "runtime-type";
}

#[derive(Debug, Serialize)]
struct CreateInstanceBody<'a> {
    name: &'a str,
    zone: &'a str,
    machine_type: &'a str,
    disk_gb: u32,
    preemptible: bool,
    labels: Vec<(&'static str, String)>,
    metadata: Vec<(&'static str, &'a str)>,
    ssh_public_key: &'a str,
    startup_script: String,
}

/// Build the boot-time script injected into the instance's startup-script
/// metadata (spec.md §4.2): opens the service port, authenticates the
/// container runtime against the image registry using the instance
/// identity token, pulls the workspace image and its peers, starts one
/// container/MicroVM per seat on the deterministic `seat_ports()`
/// assignment, and starts a reverse proxy mapping
/// `/vm/{seat}/{terminal|files|browser}` to the matching container port.
/// Opaque from the caller's perspective: the instance interprets and runs
/// it, this adapter never does.
fn build_boot_script(cfg: &VmConfig) -> String {
    let mut script = String::from("#!/usr/bin/env bash\nset -euo pipefail\n\n");
    script.push_str("ufw allow 9090/tcp || true\n");
    script.push_str(
        "gcloud auth configure-docker --quiet || docker login -u oauth2accesstoken -p \"$(curl -sf -H 'Metadata-Flavor: Google' \\\n  'http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/identity')\" \"$REGISTRY\"\n",
    );
    let _ = writeln!(script, "docker pull \"$WORKSPACE_IMAGE\"");

    for seat in 1..=cfg.seats {
        let (terminal_port, files_port, browser_port) = seat_ports(seat);
        let _ = writeln!(
            script,
            "docker run -d --name seat-{seat} -p {terminal_port}:3001 -p {files_port}:3002 -p {browser_port}:3003 \"$WORKSPACE_IMAGE\""
        );
        let _ = writeln!(script, "echo 'location /vm/{seat}/terminal {{ proxy_pass http://127.0.0.1:{terminal_port}; }}' >> /etc/wso-proxy.conf");
        let _ = writeln!(script, "echo 'location /vm/{seat}/files {{ proxy_pass http://127.0.0.1:{files_port}; }}' >> /etc/wso-proxy.conf");
        let _ = writeln!(script, "echo 'location /vm/{seat}/browser {{ proxy_pass http://127.0.0.1:{browser_port}; }}' >> /etc/wso-proxy.conf");
    }
    script.push_str("nginx -s reload || systemctl restart wso-proxy\n");
    script
}

#[derive(Debug, Deserialize)]
struct InstanceBody {
    id: String,
    name: String,
    external_ip: Option<String>,
    internal_ip: Option<String>,
    status: String,
    zone: String,
}

#[derive(Debug, Deserialize)]
struct InstanceListBody {
    instances: Vec<InstanceBody>,
}

impl From<InstanceBody> for VmInstance {
    fn from(b: InstanceBody) -> Self {
        VmInstance {
            id: b.id,
            name: b.name,
            external_ip: b.external_ip,
            internal_ip: b.internal_ip,
            status: parse_status(&b.status),
            zone: b.zone,
        }
    }
}

fn parse_status(raw: &str) -> VmStatus {
    match raw {
        "PROVISIONING" | "STAGING" => VmStatus::Provisioning,
        "RUNNING" => VmStatus::Running,
        "TERMINATED" | "STOPPING" => VmStatus::Terminated,
        _ => VmStatus::Unknown,
    }
}

/// Cloud-compute adapter. One HTTP client, one base URL; the provider's auth
/// (e.g. a service-account bearer token) is baked into `client` by whoever
/// constructs this.
#[derive(Clone)]
pub struct CloudVmBackend {
    client: reqwest::Client,
    base_url: String,
}

impl CloudVmBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    fn instances_url(&self) -> String {
        format!("{}/instances", self.base_url)
    }

    fn instance_url(&self, name: &str) -> String {
        format!("{}/instances/{name}", self.base_url)
    }
}

#[async_trait]
impl VmBackend for CloudVmBackend {
    async fn create_vm(&self, cfg: &VmConfig) -> Result<VmInstance, CoreError> {
        let name = vm_name(&cfg.workshop_id);
        let workshop_id_str = cfg.workshop_id.to_string();
        let runtime_str = cfg.runtime_type.to_string();
        let body = CreateInstanceBody {
            name: &name,
            zone: &cfg.zone,
            machine_type: &cfg.machine_type,
            disk_gb: cfg.disk_gb,
            preemptible: cfg.use_spot,
            labels: vec![("system", LABEL_SYSTEM.to_string()), ("workshop-id", workshop_id_str.clone())],
            metadata: vec![
                (metadata_keys::WORKER_AGENT_TOKEN, cfg.worker_agent_token.as_str()),
                (metadata_keys::BACKEND_URL, cfg.backend_url.as_str()),
                (metadata_keys::WORKSHOP_TOKEN_SECRET, cfg.workspace_token_secret.as_str()),
                (metadata_keys::WORKSHOP_ID, workshop_id_str.as_str()),
                (metadata_keys::RUNTIME_TYPE, runtime_str.as_str()),
            ],
            ssh_public_key: &cfg.ssh_public_key,
            startup_script: build_boot_script(cfg),
        };

        debug!(vm_name = %name, workshop_id = %cfg.workshop_id, "creating worker-host vm");
        let resp = self
            .client
            .post(self.instances_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("create_vm request failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Err(CoreError::Conflict(format!("vm {name} already exists")));
        }
        if !resp.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "create_vm returned status {}",
                resp.status()
            )));
        }
        let instance: InstanceBody = resp
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("create_vm response decode failed: {e}")))?;
        Ok(instance.into())
    }

    async fn delete_vm(&self, workshop_id: &WorkshopId) -> Result<(), CoreError> {
        let name = vm_name(workshop_id);
        let resp = self
            .client
            .delete(self.instance_url(&name))
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("delete_vm request failed: {e}")))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(vm_name = %name, "delete_vm: instance already absent");
            return Ok(());
        }
        if !resp.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "delete_vm returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn get_vm(&self, workshop_id: &WorkshopId) -> Result<Option<VmInstance>, CoreError> {
        let name = vm_name(workshop_id);
        let resp = self
            .client
            .get(self.instance_url(&name))
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("get_vm request failed: {e}")))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!("get_vm returned status {}", resp.status())));
        }
        let instance: InstanceBody = resp
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("get_vm response decode failed: {e}")))?;
        Ok(Some(instance.into()))
    }

    async fn wait_for_ready(&self, workshop_id: &WorkshopId, timeout: Duration) -> Result<VmInstance, CoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut backoff = Duration::from_secs(2);
        loop {
            if let Some(instance) = self.get_vm(workshop_id).await? {
                if instance.status == VmStatus::Running && instance.external_ip.is_some() {
                    return Ok(instance);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(CoreError::Timeout(format!("vm for workshop {workshop_id} did not become ready")));
            }
            sleep(backoff.min(deadline.saturating_duration_since(tokio::time::Instant::now()))).await;
            backoff = (backoff * 2).min(Duration::from_secs(15));
        }
    }

    async fn list_vms(&self, workshop_id: Option<&WorkshopId>) -> Result<Vec<VmInstance>, CoreError> {
        let mut req = self.client.get(self.instances_url()).query(&[("label", LABEL_SYSTEM)]);
        if let Some(id) = workshop_id {
            req = req.query(&[("workshop-id", id.as_str())]);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("list_vms request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!("list_vms returned status {}", resp.status())));
        }
        let body: InstanceListBody = resp
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("list_vms response decode failed: {e}")))?;
        Ok(body.instances.into_iter().map(VmInstance::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_map_to_expected_variants() {
        assert_eq!(parse_status("RUNNING"), VmStatus::Running);
        assert_eq!(parse_status("PROVISIONING"), VmStatus::Provisioning);
        assert_eq!(parse_status("TERMINATED"), VmStatus::Terminated);
        assert_eq!(parse_status("WEIRD"), VmStatus::Unknown);
    }

    #[test]
    fn instance_body_converts_into_vm_instance() {
        let body = InstanceBody {
            id: "i-1".into(),
            name: "wso-abc".into(),
            external_ip: Some("203.0.113.5".into()),
            internal_ip: None,
            status: "RUNNING".into(),
            zone: "us-central1-a".into(),
        };
        let instance: VmInstance = body.into();
        assert_eq!(instance.status, VmStatus::Running);
        assert_eq!(instance.external_ip.as_deref(), Some("203.0.113.5"));
    }

    fn sample_config(seats: u32) -> VmConfig {
        VmConfig {
            workshop_id: WorkshopId::from_string("wsh-abc"),
            seats,
            machine_type: "e2-standard-4".into(),
            disk_gb: 50,
            use_spot: false,
            zone: "us-central1-a".into(),
            ssh_public_key: "ssh-ed25519 AAAA".into(),
            runtime_type: wso_core::RuntimeType::Docker,
            worker_agent_token: "tok".into(),
            backend_url: "https://cp.example".into(),
            workspace_token_secret: "secret".into(),
        }
    }

    #[test]
    fn boot_script_opens_the_service_port_and_pulls_the_workspace_image() {
        let script = build_boot_script(&sample_config(1));
        assert!(script.contains("9090"));
        assert!(script.contains("docker pull"));
    }

    #[test]
    fn boot_script_starts_one_container_per_seat_on_deterministic_ports() {
        let script = build_boot_script(&sample_config(2));
        assert!(script.contains("-p 3011:3001 -p 3012:3002 -p 3013:3003"));
        assert!(script.contains("seat-1"));
        assert!(script.contains("seat-2"));
        assert!(script.contains("-p 3021:3001 -p 3022:3002 -p 3023:3003"));
    }

    #[test]
    fn boot_script_maps_the_proxy_locations_per_seat() {
        let script = build_boot_script(&sample_config(1));
        assert!(script.contains("location /vm/1/terminal"));
        assert!(script.contains("location /vm/1/files"));
        assert!(script.contains("location /vm/1/browser"));
    }
}
