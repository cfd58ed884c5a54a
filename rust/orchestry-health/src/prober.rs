//! Cooperative per-target probe loops (spec.md §4.3). One `tokio` task per
//! replica, each respecting its own `periodSeconds`; the pool is just the
//! set of spawned tasks, grounded on `other_examples`'s
//! `check_cluster_health` sweep collapsed into one task-per-target instead
//! of one sweep-per-tick, since replicas come and go independently here.

use std::sync::Arc;
use std::time::Duration;

use orchestry_types::ReplicaState;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use orchestry_store::Store;

use crate::probe::probe_once;
use crate::target::ProbeTarget;

/// A transition the prober observed, for callers that want to react beyond
/// the State Store write this loop already performs (e.g. proxy upstream
/// refresh).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ready,
    Unready,
}

pub struct HealthProber {
    client: Client,
    store: Store,
}

impl HealthProber {
    pub fn new(store: Store) -> Self {
        Self {
            client: Client::new(),
            store,
        }
    }

    /// Spawn the probe loop for one target. The caller keeps the
    /// `JoinHandle` and aborts it when the replica is removed.
    #[instrument(skip(self, on_transition), fields(instance = %target.instance_id))]
    pub fn spawn<F>(&self, target: ProbeTarget, on_transition: F) -> JoinHandle<()>
    where
        F: Fn(&ProbeTarget, Transition) + Send + Sync + 'static,
    {
        let client = self.client.clone();
        let store = self.store.clone();
        let on_transition = Arc::new(on_transition);

        tokio::spawn(async move {
            run_probe_loop(client, store, target, on_transition).await;
        })
    }
}

async fn run_probe_loop<F>(client: Client, store: Store, target: ProbeTarget, on_transition: Arc<F>)
where
    F: Fn(&ProbeTarget, Transition) + Send + Sync + 'static,
{
    if target.config.initial_delay_seconds > 0 {
        tokio::time::sleep(Duration::from_secs(target.config.initial_delay_seconds as u64)).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(target.config.period_seconds.max(1) as u64));
    let timeout = Duration::from_secs(target.config.timeout_seconds.max(1) as u64);

    let mut consecutive_successes: u32 = 0;
    let mut consecutive_failures: u32 = 0;
    // Unknown until the first threshold crossing; avoids firing a spurious
    // `unready` transition before any probe has run.
    let mut last_reported: Option<ReplicaState> = None;

    loop {
        ticker.tick().await;

        let result = probe_once(&client, &target.url, timeout).await;

        if result.healthy {
            consecutive_successes += 1;
            consecutive_failures = 0;
        } else {
            consecutive_failures += 1;
            consecutive_successes = 0;
            debug!(error = ?result.error, status = ?result.status_code, "probe failed");
        }

        if let Err(err) = store
            .update_instance_health(&target.instance_id, consecutive_failures, consecutive_successes)
            .await
        {
            warn!(error = %err, "failed to persist health probe result");
        }

        if result.healthy
            && consecutive_successes >= target.config.success_threshold
            && last_reported != Some(ReplicaState::Healthy)
        {
            last_reported = Some(ReplicaState::Healthy);
            info!("replica became ready");
            if let Err(err) = store.update_instance_status(&target.instance_id, ReplicaState::Healthy).await {
                warn!(error = %err, "failed to persist ready transition");
            }
            on_transition(&target, Transition::Ready);
        } else if !result.healthy
            && consecutive_failures >= target.config.failure_threshold
            && last_reported != Some(ReplicaState::Unhealthy)
        {
            last_reported = Some(ReplicaState::Unhealthy);
            warn!("replica became unhealthy");
            if let Err(err) = store.update_instance_status(&target.instance_id, ReplicaState::Unhealthy).await {
                warn!(error = %err, "failed to persist unhealthy transition");
            }
            on_transition(&target, Transition::Unready);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestry_types::HealthCheckConfig;

    fn target() -> ProbeTarget {
        ProbeTarget {
            instance_id: "inst-1".to_string(),
            app_name: "demo".to_string(),
            replica_index: 0,
            url: "http://127.0.0.1:9/health".to_string(),
            config: HealthCheckConfig {
                path: "/health".to_string(),
                period_seconds: 1,
                timeout_seconds: 1,
                failure_threshold: 3,
                success_threshold: 1,
                initial_delay_seconds: 0,
            },
        }
    }

    #[test]
    fn target_carries_the_full_probe_url() {
        let t = target();
        assert_eq!(t.url, "http://127.0.0.1:9/health");
        assert_eq!(t.config.failure_threshold, 3);
    }
}
