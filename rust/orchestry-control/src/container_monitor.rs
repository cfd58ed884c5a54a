//! Background container sweep (spec.md §4.7 "Background monitoring"),
//! leader-only: every 10s, restart unhealthy tracked replicas in place and
//! top up any app that slipped below its floor between control-loop ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use orchestry_replica::{ReplicaManager, Result};
use orchestry_store::Store;
use orchestry_types::AppStatus;

const PERIOD: Duration = Duration::from_secs(10);

pub struct ContainerMonitor {
    store: Store,
    replicas: Arc<ReplicaManager>,
    running: Arc<AtomicBool>,
}

impl ContainerMonitor {
    pub fn new(store: Store, replicas: Arc<ReplicaManager>, running: Arc<AtomicBool>) -> Self {
        Self { store, replicas, running }
    }

    /// Spawned as its own task from `RuntimeCallbacks::on_become_leader` and
    /// aborted from `on_lose_leadership`.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(PERIOD);
        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.sweep().await {
                warn!(error = %err, "container monitor sweep failed");
            }
        }
    }

    async fn sweep(&self) -> Result<()> {
        let apps = self.store.list_apps(Some(AppStatus::Running)).await?;
        for app in apps {
            if let Err(err) = self.replicas.check_and_restart(&app.name).await {
                warn!(app = %app.name, error = %err, "check-and-restart failed");
            }
        }
        self.replicas.ensure_min_replicas().await
    }
}
