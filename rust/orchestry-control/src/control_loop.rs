//! The control loop (spec.md §4.7): one 10-second tick across every running
//! App while this node holds leadership. Grounded on
//! `knhk-autonomic::AutonomicController::execute_cycle`'s monitor/analyze/
//! plan/execute shape, collapsed to one function per tick since there is
//! only ever one kind of cycle here, not a pluggable MAPE-K pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use orchestry_autoscaler::Autoscaler;
use orchestry_cluster::Coordinator;
use orchestry_proxy::NginxManager;
use orchestry_replica::ReplicaManager;
use orchestry_store::Store;
use orchestry_telemetry::Metrics;
use orchestry_types::{AppStatus, Event, EventKind, MetricSample, ScalingDecision};

use crate::error::Result;

const TICK_PERIOD: Duration = Duration::from_secs(10);
const ERROR_BACKOFF: Duration = Duration::from_secs(30);

/// Turns the proxy's cumulative request counter into a rate: seeded on the
/// first observation, clamped to zero on a negative delta (counter reset).
#[derive(Default)]
struct RateState {
    last_sample: Option<(DateTime<Utc>, u64)>,
}

impl RateState {
    fn observe(&mut self, now: DateTime<Utc>, cumulative_requests: u64) -> f64 {
        let rps = match self.last_sample {
            Some((last_at, last_requests)) => {
                let elapsed = (now - last_at).num_milliseconds() as f64 / 1000.0;
                let delta = cumulative_requests.saturating_sub(last_requests) as f64;
                if elapsed > 0.0 {
                    (delta / elapsed).max(0.0)
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last_sample = Some((now, cumulative_requests));
        rps
    }
}

pub struct ControlLoop {
    store: Store,
    replicas: Arc<ReplicaManager>,
    autoscaler: Arc<Autoscaler>,
    proxy: Arc<NginxManager>,
    metrics: Arc<Metrics>,
    num_cpus: f64,
    coordinator: Weak<Coordinator>,
    running: Arc<AtomicBool>,
}

impl ControlLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        replicas: Arc<ReplicaManager>,
        autoscaler: Arc<Autoscaler>,
        proxy: Arc<NginxManager>,
        metrics: Arc<Metrics>,
        num_cpus: f64,
        coordinator: Weak<Coordinator>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            replicas,
            autoscaler,
            proxy,
            metrics,
            num_cpus,
            coordinator,
            running,
        }
    }

    /// Spawned from `RuntimeCallbacks::on_become_leader`, aborted from
    /// `on_lose_leadership`. The `is_leader` check inside `run` is a
    /// defensive second line, not the primary stop mechanism: the task can
    /// still be mid-tick when the abort lands.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(TICK_PERIOD);
        let mut rate = RateState::default();
        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let is_leader = self.coordinator.upgrade().map(|c| c.is_leader()).unwrap_or(false);
            if !is_leader {
                continue;
            }

            let timer = self.metrics.control_loop_tick_seconds.with_label_values(&["control_loop"]).start_timer();
            let result = self.tick(&mut rate).await;
            timer.stop_and_record();

            if let Err(err) = result {
                warn!(error = %err, "control loop tick failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    async fn tick(&self, rate: &mut RateState) -> Result<()> {
        let now = Utc::now();

        let proxy_status = self.proxy.get_proxy_status().await?;
        let global_rps = rate.observe(now, proxy_status.requests);

        let apps = self.store.list_apps(Some(AppStatus::Running)).await?;

        let mut snapshots = Vec::with_capacity(apps.len());
        for app in &apps {
            if let Err(err) = self.replicas.sample_stats(&app.name, self.num_cpus).await {
                warn!(app = %app.name, error = %err, "failed to sample container stats");
            }
            let snapshot = self.replicas.status(&app.name).await?;
            self.metrics
                .app_replicas
                .with_label_values(&[&app.name])
                .set(snapshot.replicas.len() as f64);
            snapshots.push((app.clone(), snapshot));
        }

        let total_replicas_global: u32 = snapshots.iter().map(|(_, s)| s.replicas.len() as u32).sum();

        for (app, snapshot) in &snapshots {
            let instance_count = snapshot.replicas.len() as u32;
            let share = if total_replicas_global > 0 {
                instance_count as f64 / total_replicas_global as f64
            } else {
                0.0
            };

            let rps_app = global_rps * share;
            let conn_app = (proxy_status.active_connections as f64 * share) as u32;
            let cpu_percent = mean(snapshot.replicas.iter().filter_map(|r| r.cpu_percent));
            let memory_percent = mean(snapshot.replicas.iter().filter_map(|r| r.memory_percent));

            let sample = MetricSample {
                timestamp: now,
                requests_per_second: rps_app,
                // stub_status carries no latency histogram; until an
                // access-log-based sampler lands, latency only enters the
                // window via the `simulateMetrics` admin endpoint.
                p95_latency_ms: 0.0,
                active_connections: conn_app,
                cpu_percent,
                memory_percent,
            };
            self.autoscaler.add_metrics(&app.name, sample);

            let decision = self.autoscaler.evaluate(&app.name, instance_count, app.mode, now);
            let ScalingDecision::Scale { target, reason, .. } = &decision else {
                continue;
            };
            if *target == instance_count {
                continue;
            }

            debug!(app = %app.name, from = instance_count, to = target, %reason, "control loop scaling app");
            match self.replicas.scale_with_reason(&app.name, *target, reason).await {
                Ok(()) => {
                    self.autoscaler.record_scaling_action(&app.name, now);
                    let direction = if *target > instance_count { "scale_up" } else { "scale_down" };
                    self.metrics
                        .scaling_decisions_total
                        .with_label_values(&[&app.name, direction])
                        .inc();

                    let kind = if *target > instance_count {
                        EventKind::ScaledUp { from: instance_count, to: *target }
                    } else {
                        EventKind::ScaledDown { from: instance_count, to: *target }
                    };
                    self.store
                        .add_event(&Event {
                            id: uuid::Uuid::new_v4(),
                            app_name: Some(app.name.clone()),
                            kind,
                            message: format!("autoscaler: {reason}"),
                            detail: None,
                            occurred_at: now,
                        })
                        .await
                        .ok();
                }
                Err(err) => warn!(app = %app.name, error = %err, "autoscaler-driven scale failed"),
            }
        }

        Ok(())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_state_is_zero_on_first_observation() {
        let mut rate = RateState::default();
        let rps = rate.observe(Utc::now(), 1000);
        assert_eq!(rps, 0.0);
    }

    #[test]
    fn rate_state_derives_rps_from_counter_delta() {
        let mut rate = RateState::default();
        let t0 = Utc::now();
        rate.observe(t0, 1000);
        let rps = rate.observe(t0 + chrono::Duration::seconds(10), 1500);
        assert_eq!(rps, 50.0);
    }

    #[test]
    fn rate_state_clamps_negative_delta_to_zero() {
        let mut rate = RateState::default();
        let t0 = Utc::now();
        rate.observe(t0, 1000);
        let rps = rate.observe(t0 + chrono::Duration::seconds(10), 200);
        assert_eq!(rps, 0.0);
    }

    #[test]
    fn mean_of_empty_iterator_is_zero() {
        assert_eq!(mean(std::iter::empty()), 0.0);
    }

    #[test]
    fn mean_averages_values() {
        assert_eq!(mean([10.0, 20.0, 30.0].into_iter()), 20.0);
    }
}
