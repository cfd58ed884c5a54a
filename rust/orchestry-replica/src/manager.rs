//! The Replica Manager (spec.md §4.5, Component C5): actuates the desired
//! replica set per App and holds the authoritative live view. Grounded on
//! Materialize's `ComputeOrchestrator::ensure_replica_location` for the
//! "ensure desired state, adopt what already matches" shape, generalized
//! from k8s/cloud services to `bollard` containers.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use orchestry_proxy::{NginxManager, UpstreamServer};
use orchestry_store::Store;
use orchestry_types::{
    App, AppStatus, ContainerInstance, EnvValueSource, Event, EventKind, ReplicaState,
};

use crate::docker::DockerRuntime;
use crate::error::Result;
use crate::index::ReplicaIndex;
use crate::labels::replica_index_of;

/// Reported aggregate status for `status(app)` (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppHealth {
    Running,
    Degraded,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct AppStatusSnapshot {
    pub replicas: Vec<ContainerInstance>,
    pub ready_replicas: u32,
    pub health: AppHealth,
}

pub struct ReplicaManager {
    docker: DockerRuntime,
    store: Store,
    proxy: NginxManager,
    index: ReplicaIndex,
    /// Guards reconciliation/recreate against the background monitor racing
    /// with a foreground `scale`/`start`/`stop` call (spec.md §4.5
    /// "Concurrency discipline").
    restart_lock: Mutex<()>,
}

fn resolve_env(env: &[orchestry_types::EnvVar]) -> Vec<String> {
    env.iter()
        .map(|var| {
            let value = match &var.source {
                EnvValueSource::Value { value } => value.clone(),
                // Cross-app SDK wiring and secret resolution happen at the
                // control-loop layer, which has visibility into every app's
                // registered state; by the time a spec reaches this crate it
                // is resolved or intentionally left blank.
                EnvValueSource::Sdk { .. } | EnvValueSource::Secret { .. } => String::new(),
            };
            format!("{}={value}", var.name)
        })
        .collect()
}

impl ReplicaManager {
    pub fn new(docker: DockerRuntime, store: Store, proxy: NginxManager) -> Self {
        Self {
            docker,
            store,
            proxy,
            index: ReplicaIndex::new(),
            restart_lock: Mutex::new(()),
        }
    }

    /// `register(spec)`.
    #[instrument(skip(self, app), fields(app = %app.name))]
    pub async fn register(&self, mut app: App) -> Result<()> {
        app.status = AppStatus::Stopped;
        app.replicas = 0;
        self.store.save_app(&app).await?;
        self.index.clear_app(&app.name).await;
        self.store
            .add_event(&Event {
                id: Uuid::new_v4(),
                app_name: Some(app.name.clone()),
                kind: EventKind::Registered,
                message: format!("app {} registered", app.name),
                detail: None,
                occurred_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    /// `start(app)`.
    #[instrument(skip(self))]
    pub async fn start(&self, app_name: &str) -> Result<()> {
        self.store.update_app_status(app_name, AppStatus::Running).await?;
        self.reconcile_app(app_name).await?;

        let app = self.store.get_app(app_name).await?;
        let min_replicas = app.scaling.as_ref().map(|s| s.min_replicas).unwrap_or(1);
        self.top_up(&app, min_replicas).await?;
        self.refresh_proxy(app_name).await?;

        self.store
            .add_event(&Event {
                id: Uuid::new_v4(),
                app_name: Some(app_name.to_string()),
                kind: EventKind::Started,
                message: format!("app {app_name} started"),
                detail: None,
                occurred_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    /// `stop(app)`.
    #[instrument(skip(self))]
    pub async fn stop(&self, app_name: &str) -> Result<()> {
        let app = self.store.get_app(app_name).await?;
        let grace = app.termination.termination_grace_period_seconds as i64;
        let replicas = self.index.get(app_name).await;

        for replica in &replicas {
            if let Err(err) = self.docker.stop_with_grace(&replica.container_id, grace).await {
                warn!(error = %err, replica = replica.replica_index, "graceful stop failed, removing anyway");
            }
            if let Err(err) = self.docker.remove(&replica.container_id).await {
                warn!(error = %err, replica = replica.replica_index, "remove failed");
            }
            self.store.delete_instance(&replica.id).await.ok();
        }

        self.index.clear_app(app_name).await;
        self.store.update_app_status(app_name, AppStatus::Stopped).await?;
        self.store.update_app_replicas(app_name, 0).await?;
        self.proxy.remove_app_config(app_name).await.ok();

        self.store
            .add_event(&Event {
                id: Uuid::new_v4(),
                app_name: Some(app_name.to_string()),
                kind: EventKind::Stopped,
                message: format!("app {app_name} stopped"),
                detail: None,
                occurred_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    /// `scale(app, n)`, invoked by the admin API on an operator's explicit
    /// request.
    #[instrument(skip(self))]
    pub async fn scale(&self, app_name: &str, target: u32) -> Result<()> {
        self.scale_with_reason(app_name, target, "manual").await
    }

    /// Same actuation as `scale`, but lets the caller attribute the resize
    /// to something other than an operator action (the control loop passes
    /// the Autoscaler's own decision reason here).
    #[instrument(skip(self))]
    pub async fn scale_with_reason(&self, app_name: &str, target: u32, reason: &str) -> Result<()> {
        let current = self.index.get(app_name).await.len() as u32;
        if target == current {
            return Ok(());
        }

        let app = self.store.get_app(app_name).await?;

        if target > current {
            self.top_up(&app, target).await?;
            self.store
                .add_event(&Event {
                    id: Uuid::new_v4(),
                    app_name: Some(app_name.to_string()),
                    kind: EventKind::ScaledUp { from: current, to: target },
                    message: format!("scaled {app_name} from {current} to {target}: {reason}"),
                    detail: None,
                    occurred_at: Utc::now(),
                })
                .await?;
        } else {
            self.scale_down_to(app_name, &app, target).await?;
            self.store
                .add_event(&Event {
                    id: Uuid::new_v4(),
                    app_name: Some(app_name.to_string()),
                    kind: EventKind::ScaledDown { from: current, to: target },
                    message: format!("scaled {app_name} from {current} to {target}: {reason}"),
                    detail: None,
                    occurred_at: Utc::now(),
                })
                .await?;
        }

        self.store.update_app_replicas(app_name, target).await?;
        self.store
            .add_scaling_event(app_name, current, target, reason, None)
            .await?;
        self.refresh_proxy(app_name).await?;
        Ok(())
    }

    async fn scale_down_to(&self, app_name: &str, app: &App, target: u32) -> Result<()> {
        let mut replicas = self.index.get(app_name).await;
        replicas.sort_by_key(|r| std::cmp::Reverse(r.replica_index));

        let grace = app.termination.termination_grace_period_seconds as i64;
        let to_remove = replicas.len().saturating_sub(target as usize);
        for replica in replicas.into_iter().take(to_remove) {
            if let Err(err) = self.docker.stop_with_grace(&replica.container_id, grace).await {
                warn!(error = %err, replica = replica.replica_index, "graceful stop failed during scale-down");
            }
            self.docker.remove(&replica.container_id).await.ok();
            self.store.delete_instance(&replica.id).await.ok();
            self.index.remove(app_name, replica.replica_index).await;
        }
        Ok(())
    }

    /// `status(app)`.
    #[instrument(skip(self))]
    pub async fn status(&self, app_name: &str) -> Result<AppStatusSnapshot> {
        self.sweep_recently_stopped(app_name).await;

        let replicas = self.index.get(app_name).await;
        let ready = replicas.iter().filter(|r| r.state.is_routable()).count() as u32;

        let health = if replicas.is_empty() {
            AppHealth::Stopped
        } else if ready == replicas.len() as u32 {
            AppHealth::Running
        } else {
            AppHealth::Degraded
        };

        Ok(AppStatusSnapshot { replicas, ready_replicas: ready, health })
    }

    async fn sweep_recently_stopped(&self, app_name: &str) {
        let cutoff = Utc::now() - chrono::Duration::seconds(30);
        let stale: Vec<u32> = {
            let guard = self.index.lock().await;
            guard
                .get(app_name)
                .map(|replicas| {
                    replicas
                        .values()
                        .filter(|r| r.state == ReplicaState::Stopped && r.updated_at < cutoff)
                        .map(|r| r.replica_index)
                        .collect()
                })
                .unwrap_or_default()
        };
        for index in stale {
            self.index.remove(app_name, index).await;
        }
    }

    /// `reconcileApp(app)`.
    #[instrument(skip(self))]
    pub async fn reconcile_app(&self, app_name: &str) -> Result<u32> {
        let _guard = self.restart_lock.lock().await;
        let containers = self.docker.list_by_label(app_name).await?;
        let mut adopted = 0u32;

        for container in containers {
            let Some(index) = replica_index_of(app_name, &container.name, &container.labels) else {
                continue;
            };

            if !container.running {
                if let Err(err) = self.docker.start_existing(&container.id).await {
                    warn!(error = %err, container = %container.name, "failed to start existing container during reconcile");
                    continue;
                }
            }

            let already_tracked = {
                let guard = self.index.lock().await;
                guard.get(app_name).map(|m| m.contains_key(&index)).unwrap_or(false)
            };

            if !already_tracked {
                let now = Utc::now();
                let instance = ContainerInstance {
                    id: format!("{app_name}-{index}"),
                    app_name: app_name.to_string(),
                    replica_index: index,
                    container_id: container.id,
                    state: ReplicaState::Healthy,
                    host_port: None,
                    container_port: 0,
                    consecutive_health_failures: 0,
                    consecutive_health_successes: 0,
                    last_health_check_at: None,
                    cpu_percent: None,
                    memory_percent: None,
                    restart_count: 0,
                    created_at: now,
                    updated_at: now,
                };
                self.store.save_instance(&instance).await?;
                self.index.insert(app_name, instance).await;
                adopted += 1;
            }
        }

        Ok(adopted)
    }

    /// `reconcileAll()`.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<std::collections::HashMap<String, u32>> {
        let apps = self.store.list_apps(None).await?;
        let mut adopted = std::collections::HashMap::new();
        for app in apps {
            let count = self.reconcile_app(&app.name).await?;
            adopted.insert(app.name, count);
        }
        Ok(adopted)
    }

    /// `cleanupOrphans()`.
    #[instrument(skip(self))]
    pub async fn cleanup_orphans(&self) -> Result<u32> {
        let known: std::collections::HashSet<String> =
            self.store.list_apps(None).await?.into_iter().map(|a| a.name).collect();

        let containers = self.docker.list_all_orchestry_labelled().await?;
        let mut removed = 0;
        for container in containers {
            let Some(app_name) = container.labels.get(crate::labels::APP_LABEL) else {
                continue;
            };
            if known.contains(app_name) {
                continue;
            }
            self.docker.stop_with_grace(&container.id, 10).await.ok();
            self.docker.remove(&container.id).await.ok();
            removed += 1;
        }
        Ok(removed)
    }

    /// Background sweep step 1 (spec.md §4.5 "Background monitoring"):
    /// restart or recreate unhealthy tracked replicas.
    #[instrument(skip(self))]
    pub async fn check_and_restart(&self, app_name: &str) -> Result<()> {
        let _guard = self.restart_lock.lock().await;
        let replicas = self.index.get(app_name).await;

        for replica in replicas {
            let running = self.docker.is_running(&replica.container_id).await.unwrap_or(false);
            if running {
                continue;
            }

            match self.docker.start_existing(&replica.container_id).await {
                Ok(()) => {
                    debug!(replica = replica.replica_index, "restarted in place");
                    self.store
                        .update_instance_status(&replica.id, ReplicaState::Starting)
                        .await
                        .ok();
                }
                Err(err) => {
                    warn!(error = %err, replica = replica.replica_index, "in-place restart failed, dropping from index");
                    self.index.remove(app_name, replica.replica_index).await;
                    self.store.delete_instance(&replica.id).await.ok();
                    self.store
                        .add_event(&Event {
                            id: Uuid::new_v4(),
                            app_name: Some(app_name.to_string()),
                            kind: EventKind::ReplicaFailed { replica_index: replica.replica_index },
                            message: format!("replica {} failed and was dropped", replica.replica_index),
                            detail: None,
                            occurred_at: Utc::now(),
                        })
                        .await
                        .ok();
                }
            }
        }
        Ok(())
    }

    /// Background sweep step 2: re-ensure `minReplicas` for every running app.
    #[instrument(skip(self))]
    pub async fn ensure_min_replicas(&self) -> Result<()> {
        let apps = self.store.list_apps(Some(AppStatus::Running)).await?;
        for app in apps {
            let min = app.scaling.as_ref().map(|s| s.min_replicas).unwrap_or(1);
            self.top_up(&app, min).await?;
        }
        Ok(())
    }

    async fn top_up(&self, app: &App, target: u32) -> Result<()> {
        loop {
            let current = self.index.get(&app.name).await.len() as u32;
            if current >= target {
                break;
            }
            let index = self.index.next_free_index(&app.name).await;
            match self.create_replica(app, index).await {
                Ok(()) => {}
                Err(err) => {
                    warn!(error = %err, app = %app.name, index, "failed to create replica");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn create_replica(&self, app: &App, index: u32) -> Result<()> {
        let env = resolve_env(&app.env);
        let (container_id, host_port) = self
            .docker
            .create_and_start(&app.name, &app.image, &app.command, &env, &app.ports, &app.resources, index)
            .await?;

        let now = Utc::now();
        let instance = ContainerInstance {
            id: format!("{}-{index}", app.name),
            app_name: app.name.clone(),
            replica_index: index,
            container_id,
            state: ReplicaState::Starting,
            host_port,
            container_port: app.ports.first().map(|p| p.container_port).unwrap_or(0),
            consecutive_health_failures: 0,
            consecutive_health_successes: 0,
            last_health_check_at: None,
            cpu_percent: None,
            memory_percent: None,
            restart_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.save_instance(&instance).await?;
        self.index.insert(&app.name, instance).await;
        Ok(())
    }

    /// Stats sampling (spec.md §4.5, every control-loop tick).
    #[instrument(skip(self))]
    pub async fn sample_stats(&self, app_name: &str, num_cpus: f64) -> Result<()> {
        let replicas = self.index.get(app_name).await;
        for mut replica in replicas {
            let running = self.docker.is_running(&replica.container_id).await.unwrap_or(false);
            if !running {
                replica.state = ReplicaState::Unhealthy;
                replica.cpu_percent = Some(0.0);
                replica.memory_percent = Some(0.0);
            } else if let Ok(sample) = self.docker.sample_stats(&replica.container_id, num_cpus).await {
                replica.cpu_percent = Some(sample.cpu_percent);
                replica.memory_percent = Some(sample.memory_percent);
            }
            replica.updated_at = Utc::now();
            self.index.insert(app_name, replica).await;
        }
        Ok(())
    }

    /// Re-render the proxy's upstream list for `app_name` from this node's
    /// in-memory replica index. Only meaningful on the leader, whose index
    /// is the one actually populated by `create_replica`/`reconcile_app`.
    pub async fn refresh_proxy(&self, app_name: &str) -> Result<()> {
        let replicas = self.index.get(app_name).await;
        let servers: Vec<UpstreamServer> = replicas
            .iter()
            .filter(|r| r.state.is_routable())
            .filter_map(|r| r.host_port.map(|port| UpstreamServer { host: "127.0.0.1".to_string(), port }))
            .collect();
        if let Err(err) = self.proxy.update_upstreams(app_name, &servers).await {
            warn!(error = %err, app = %app_name, "proxy upstream refresh failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestry_types::EnvVar;

    #[test]
    fn resolve_env_renders_literal_values() {
        let env = vec![EnvVar { name: "PORT".to_string(), source: EnvValueSource::Value { value: "8080".to_string() } }];
        assert_eq!(resolve_env(&env), vec!["PORT=8080".to_string()]);
    }

    #[test]
    fn resolve_env_blanks_unresolved_sdk_sources() {
        let env = vec![EnvVar {
            name: "UPSTREAM".to_string(),
            source: EnvValueSource::Sdk { sdk_key: "k".to_string() },
        }];
        assert_eq!(resolve_env(&env), vec!["UPSTREAM=".to_string()]);
    }
}
