//! Keeps the set of per-replica HTTP health-check tasks (spec.md §4.3) in
//! sync with the State Store's view of running instances. Runs on every
//! node regardless of leadership: probing a container's health endpoint and
//! recording the result is read-only with respect to cluster state, which
//! is exactly the work spec.md §5 allows a follower to keep doing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use orchestry_cluster::Coordinator;
use orchestry_health::{HealthProber, ProbeTarget};
use orchestry_replica::ReplicaManager;
use orchestry_store::{Result, Store};
use orchestry_types::{AppStatus, HealthCheckConfig, ReplicaState};

const PERIOD: Duration = Duration::from_secs(10);

fn default_health_check() -> HealthCheckConfig {
    HealthCheckConfig {
        path: "/health".to_string(),
        period_seconds: 10,
        timeout_seconds: 5,
        failure_threshold: 3,
        success_threshold: 1,
        initial_delay_seconds: 0,
    }
}

pub struct HealthSyncWorker {
    store: Store,
    health: Arc<HealthProber>,
    replicas: Arc<ReplicaManager>,
    coordinator: Arc<Coordinator>,
    running: Arc<AtomicBool>,
    targets: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl HealthSyncWorker {
    pub fn new(
        store: Store,
        health: Arc<HealthProber>,
        replicas: Arc<ReplicaManager>,
        coordinator: Arc<Coordinator>,
        running: Arc<AtomicBool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            health,
            replicas,
            coordinator,
            running,
            targets: Mutex::new(HashMap::new()),
        })
    }

    /// Spawned once at bootstrap on every node; stopped as part of the
    /// graceful shutdown sequence (spec.md §5), after the container monitor
    /// and before the store connections close.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(PERIOD);
        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.sync().await {
                warn!(error = %err, "health sync failed");
            }
        }
        let mut targets = self.targets.lock().await;
        for (_, handle) in targets.drain() {
            handle.abort();
        }
    }

    async fn sync(&self) -> Result<()> {
        let apps = self.store.list_apps(Some(AppStatus::Running)).await?;
        let mut desired = HashMap::new();

        for app in &apps {
            let config = app.health_check.clone().unwrap_or_else(default_health_check);
            let instances = self.store.get_instances(&app.name, None).await?;
            for instance in instances {
                if matches!(instance.state, ReplicaState::Stopped | ReplicaState::Stopping) {
                    continue;
                }
                let Some(port) = instance.host_port else { continue };
                desired.insert(
                    instance.id.clone(),
                    ProbeTarget {
                        instance_id: instance.id,
                        app_name: app.name.clone(),
                        replica_index: instance.replica_index,
                        url: format!("http://127.0.0.1:{port}{}", config.path),
                        config: config.clone(),
                    },
                );
            }
        }

        let mut targets = self.targets.lock().await;
        targets.retain(|id, handle| {
            if desired.contains_key(id) {
                true
            } else {
                handle.abort();
                false
            }
        });

        for (id, target) in desired {
            if targets.contains_key(&id) {
                continue;
            }
            let replicas = self.replicas.clone();
            let coordinator = self.coordinator.clone();
            let handle = self.health.spawn(target, move |target, _transition| {
                // Only the leader's Replica Manager holds a populated
                // in-memory index; a follower pushing its (empty) view
                // would blank out the live upstream list.
                if !coordinator.is_leader() {
                    return;
                }
                let replicas = replicas.clone();
                let app_name = target.app_name.clone();
                tokio::spawn(async move {
                    if let Err(err) = replicas.refresh_proxy(&app_name).await {
                        warn!(error = %err, app = %app_name, "proxy refresh after health transition failed");
                    }
                });
            });
            targets.insert(id, handle);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_health_check_matches_registration_defaults() {
        let config = default_health_check();
        assert_eq!(config.path, "/health");
        assert_eq!(config.period_seconds, 10);
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.success_threshold, 1);
        assert_eq!(config.initial_delay_seconds, 0);
    }
}
