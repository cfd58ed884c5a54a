//! Thin wrapper over `bollard`'s Docker Engine API client (spec.md §4.5).
//! Grounded on `examples/other_examples/...alob-mtc-invok__runtime-src-core-builder.rs`
//! for the `Docker::connect_with_*` / `Arc<Docker>` composition shape; the
//! rest is this crate's own translation of spec.md's container operations.

use std::collections::HashMap;

use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions, StartContainerOptions,
    StatsOptions, StopContainerOptions,
};
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use futures::StreamExt;

use orchestry_types::{PortProtocol, PortSpec, ResourceRequests};

use crate::error::Result;
use crate::labels::{container_name, labels_for};
use crate::resources::{parse_cpu_nanos, parse_memory_bytes};

/// A minimal view of a running/stopped container, enough for
/// `reconcileApp`/`cleanupOrphans` to decide what to adopt or tear down.
#[derive(Debug, Clone)]
pub struct ContainerView {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub running: bool,
}

/// Percent-of-capacity sample for one replica.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self> {
        Ok(Self {
            docker: Docker::connect_with_local_defaults()?,
        })
    }

    pub async fn create_and_start(
        &self,
        app_name: &str,
        image: &str,
        command: &[String],
        env: &[String],
        ports: &[PortSpec],
        resources: &ResourceRequests,
        index: u32,
    ) -> Result<(String, Option<u16>)> {
        let name = container_name(app_name, index);

        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for port in ports {
            let proto = match port.protocol {
                PortProtocol::Tcp => "tcp",
                PortProtocol::Udp => "udp",
            };
            let key = format!("{}/{proto}", port.container_port);
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    // Leaving host_port empty asks the engine to assign one;
                    // we read the assignment back via inspect after start.
                    host_port: None,
                }]),
            );
        }

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            nano_cpus: Some(parse_cpu_nanos(&resources.cpu)?),
            memory: Some(parse_memory_bytes(&resources.memory)?),
            ..Default::default()
        };

        let config = Config {
            image: Some(image.to_string()),
            cmd: if command.is_empty() { None } else { Some(command.to_vec()) },
            env: if env.is_empty() { None } else { Some(env.to_vec()) },
            labels: Some(labels_for(app_name, index)),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(Some(CreateContainerOptions { name: name.clone(), platform: None }), config)
            .await?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;

        let host_port = self.assigned_host_port(&created.id, ports.first()).await?;

        Ok((created.id, host_port))
    }

    async fn assigned_host_port(&self, container_id: &str, port: Option<&PortSpec>) -> Result<Option<u16>> {
        let Some(port) = port else { return Ok(None) };
        let inspected = self.docker.inspect_container(container_id, None).await?;
        let bound = inspected
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|ports| {
                let proto = match port.protocol {
                    PortProtocol::Tcp => "tcp",
                    PortProtocol::Udp => "udp",
                };
                ports.get(&format!("{}/{proto}", port.container_port)).cloned().flatten()
            })
            .and_then(|bindings| bindings.into_iter().next())
            .and_then(|binding| binding.host_port)
            .and_then(|raw| raw.parse().ok());
        Ok(bound)
    }

    pub async fn start_existing(&self, container_id: &str) -> Result<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    pub async fn stop_with_grace(&self, container_id: &str, grace_seconds: i64) -> Result<()> {
        self.docker
            .stop_container(container_id, Some(StopContainerOptions { t: grace_seconds }))
            .await?;
        Ok(())
    }

    pub async fn remove(&self, container_id: &str) -> Result<()> {
        self.docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions { force: true, v: true, link: false }),
            )
            .await?;
        Ok(())
    }

    pub async fn is_running(&self, container_id: &str) -> Result<bool> {
        let inspected = self.docker.inspect_container(container_id, None).await?;
        Ok(inspected.state.and_then(|s| s.running).unwrap_or(false))
    }

    pub async fn list_by_label(&self, app_name: &str) -> Result<Vec<ContainerView>> {
        self.list_with_filter(Some(app_name)).await
    }

    pub async fn list_all_orchestry_labelled(&self) -> Result<Vec<ContainerView>> {
        self.list_with_filter(None).await
    }

    async fn list_with_filter(&self, app_name: Option<&str>) -> Result<Vec<ContainerView>> {
        let mut filters = HashMap::new();
        match app_name {
            Some(app) => {
                filters.insert("label".to_string(), vec![format!("{}={app}", crate::labels::APP_LABEL)]);
            }
            None => {
                filters.insert("label".to_string(), vec![crate::labels::APP_LABEL.to_string()]);
            }
        }

        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions { all: true, filters, ..Default::default() }))
            .await?;

        Ok(summaries
            .into_iter()
            .map(|summary| ContainerView {
                id: summary.id.unwrap_or_default(),
                name: summary
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                labels: summary.labels.unwrap_or_default(),
                running: summary.state.as_deref() == Some("running"),
            })
            .collect())
    }

    pub async fn sample_stats(&self, container_id: &str, num_cpus: f64) -> Result<StatsSample> {
        let mut stream = self
            .docker
            .stats(container_id, Some(StatsOptions { stream: false, one_shot: true }));

        let Some(stats) = stream.next().await else {
            return Ok(StatsSample::default());
        };
        let stats = stats?;

        let cpu_delta = stats.cpu_stats.cpu_usage.total_usage as f64
            - stats.precpu_stats.cpu_usage.total_usage as f64;
        let system_delta = stats.cpu_stats.system_cpu_usage.unwrap_or(0) as f64
            - stats.precpu_stats.system_cpu_usage.unwrap_or(0) as f64;
        let cpu_percent = if system_delta > 0.0 && cpu_delta > 0.0 {
            (cpu_delta / system_delta) * num_cpus * 100.0
        } else {
            0.0
        };

        let memory_percent = match (stats.memory_stats.usage, stats.memory_stats.limit) {
            (Some(usage), Some(limit)) if limit > 0 => (usage as f64 / limit as f64) * 100.0,
            _ => 0.0,
        };

        Ok(StatsSample { cpu_percent, memory_percent })
    }
}
