//! The `Autoscaler` (spec.md §4.6, Component C6): rolling windows feeding a
//! hysteresis-aware scale decision per app. All public methods are guarded
//! by a single lock over per-app state, per the spec's "single lock, deques
//! and counters only touched while held" discipline — the same shape as
//! `knhk-autonomic::AutonomicController`'s `Arc<RwLock<Component>>` fan-out,
//! collapsed here to one `Mutex<HashMap<_, _>>` since every app's state is
//! independent and there's no cross-component coordination to serialize.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use orchestry_types::{
    MetricSample, ScaleFactors, ScalingDecision, ScalingMode, ScalingPolicy, TriggerMetric, WindowAggregate,
};

use crate::factors::{compute_factors, EMERGENCY_SCALE_FACTOR};
use crate::window::MetricWindow;

const MIN_SCALE_IN_STABLE_PERIODS: u32 = 3;

#[derive(Default)]
struct AppState {
    policy: Option<ScalingPolicy>,
    window: MetricWindow,
    last_scale_time: Option<DateTime<Utc>>,
    scale_in_stable_periods: u32,
}

#[derive(Default)]
pub struct Autoscaler {
    apps: Mutex<HashMap<String, AppState>>,
}

fn zero_aggregate() -> WindowAggregate {
    WindowAggregate {
        mean_rps: 0.0,
        p95_latency_ms: 0.0,
        mean_connections: 0.0,
        mean_cpu_percent: 0.0,
        mean_memory_percent: 0.0,
        sample_count: 0,
    }
}

fn clamp(target: u32, min: u32, max: u32) -> u32 {
    target.clamp(min, max)
}

fn dominant_trigger(rps: Option<f64>, latency: Option<f64>, conn: Option<f64>, cpu: Option<f64>, mem: Option<f64>, dominant: f64) -> TriggerMetric {
    let candidates = [
        (rps, TriggerMetric::Rps),
        (latency, TriggerMetric::Latency),
        (conn, TriggerMetric::Connections),
        (cpu, TriggerMetric::Cpu),
        (mem, TriggerMetric::Memory),
    ];
    candidates
        .into_iter()
        .find(|(value, _)| *value == Some(dominant))
        .map(|(_, kind)| kind)
        .unwrap_or(TriggerMetric::Rps)
}

impl Autoscaler {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, policy))]
    pub fn set_policy(&self, app: &str, policy: ScalingPolicy) {
        let mut apps = self.apps.lock();
        apps.entry(app.to_string()).or_default().policy = Some(policy);
    }

    pub fn get_policy(&self, app: &str) -> Option<ScalingPolicy> {
        self.apps.lock().get(app).and_then(|s| s.policy.clone())
    }

    #[instrument(skip(self, sample))]
    pub fn add_metrics(&self, app: &str, sample: MetricSample) {
        let mut apps = self.apps.lock();
        let state = apps.entry(app.to_string()).or_default();
        let window_seconds = state.policy.as_ref().map(|p| p.window_seconds).unwrap_or(20);
        state.window.push(sample, window_seconds);
    }

    /// `evaluate(app, currentReplicas, mode)` (spec.md §4.6 steps 1-12).
    #[instrument(skip(self))]
    pub fn evaluate(&self, app: &str, current_replicas: u32, mode: ScalingMode, now: DateTime<Utc>) -> ScalingDecision {
        let mut apps = self.apps.lock();
        let state = apps.entry(app.to_string()).or_default();

        if mode == ScalingMode::Manual {
            return ScalingDecision::NoScale { reason: "manual mode".to_string() };
        }

        let Some(policy) = state.policy.clone() else {
            return ScalingDecision::NoScale { reason: "no policy".to_string() };
        };

        // Invariant #1: floor enforcement bypasses cooldown and no-metrics.
        if current_replicas < policy.min_replicas {
            state.scale_in_stable_periods = 0;
            let snapshot = state.window.aggregate(now, policy.window_seconds).unwrap_or_else(zero_aggregate);
            return ScalingDecision::Scale {
                target: policy.min_replicas,
                reason: "below-minimum".to_string(),
                triggered_by: TriggerMetric::Floor,
                metrics_snapshot: snapshot,
            };
        }

        if let Some(last) = state.last_scale_time {
            if now.signed_duration_since(last).num_seconds() < policy.cooldown_seconds as i64 {
                return ScalingDecision::NoScale { reason: "cooldown".to_string() };
            }
        }

        let Some(aggregate) = state.window.aggregate(now, policy.window_seconds) else {
            return ScalingDecision::NoScale { reason: "no metrics".to_string() };
        };

        let factors = compute_factors(&aggregate, &policy, current_replicas);
        let Some(f) = factors.dominant() else {
            return ScalingDecision::NoScale { reason: "no metrics".to_string() };
        };

        let scale_out_threshold = policy.scale_out_threshold_pct / 100.0;
        let scale_in_threshold = policy.scale_in_threshold_pct / 100.0;

        let mut decision = if f >= EMERGENCY_SCALE_FACTOR {
            state.scale_in_stable_periods = 0;
            let target = (current_replicas + 1).min(policy.max_replicas);
            ScalingDecision::Scale {
                target,
                reason: "no healthy replicas, emergency scale up".to_string(),
                triggered_by: TriggerMetric::Emergency,
                metrics_snapshot: aggregate,
            }
        } else if f > scale_out_threshold && current_replicas < policy.max_replicas {
            state.scale_in_stable_periods = 0;
            let desired = (current_replicas as f64 * f).ceil() as u32;
            let desired = desired.max(current_replicas + 1);
            let target = desired.min(policy.max_replicas);
            let trigger = dominant_trigger(factors.rps_factor, factors.latency_factor, factors.connections_factor, factors.cpu_factor, factors.memory_factor, f);
            ScalingDecision::Scale {
                target,
                reason: format!("scale out: max factor {f:.2} > {scale_out_threshold:.2}"),
                triggered_by: trigger,
                metrics_snapshot: aggregate,
            }
        } else if f < scale_in_threshold && current_replicas > policy.min_replicas {
            state.scale_in_stable_periods += 1;
            let stable = state.scale_in_stable_periods;
            if stable >= MIN_SCALE_IN_STABLE_PERIODS {
                state.scale_in_stable_periods = 0;
                let target = (current_replicas - 1).max(policy.min_replicas);
                let trigger = dominant_trigger(factors.rps_factor, factors.latency_factor, factors.connections_factor, factors.cpu_factor, factors.memory_factor, f);
                ScalingDecision::Scale {
                    target,
                    reason: format!("scale in: max factor {f:.2} < {scale_in_threshold:.2}, stable for {stable} periods"),
                    triggered_by: trigger,
                    metrics_snapshot: aggregate,
                }
            } else {
                debug!(app, stable, "scale-in criteria met, waiting for stability");
                ScalingDecision::NoScale {
                    reason: format!("waiting for stability before scaling in ({stable}/{MIN_SCALE_IN_STABLE_PERIODS})"),
                }
            }
        } else {
            state.scale_in_stable_periods = 0;
            ScalingDecision::NoScale { reason: "metrics within thresholds".to_string() }
        };

        // Invariant #2: clamp the final target, whatever branch produced it.
        if let ScalingDecision::Scale { target, reason, triggered_by, metrics_snapshot } = decision {
            let clamped = clamp(target, policy.min_replicas, policy.max_replicas);
            if clamped != target {
                decision = ScalingDecision::Scale {
                    target: clamped,
                    reason: format!("{reason} (enforcing minimum/maximum)"),
                    triggered_by,
                    metrics_snapshot,
                };
            } else {
                decision = ScalingDecision::Scale { target, reason, triggered_by, metrics_snapshot };
            }
        }

        if let ScalingDecision::Scale { target, .. } = &decision {
            info!(app, current_replicas, target, "scaling decision");
        }

        decision
    }

    /// Read-only window aggregate and per-metric scale factors for
    /// `GET /apps/{name}/metrics`. Does not touch cooldown or scale-in
    /// hysteresis state, unlike `evaluate` — an admin read must never
    /// perturb the next tick's decision.
    pub fn snapshot(&self, app: &str, current_replicas: u32, now: DateTime<Utc>) -> Option<(WindowAggregate, ScaleFactors)> {
        let apps = self.apps.lock();
        let state = apps.get(app)?;
        let policy = state.policy.clone()?;
        let aggregate = state.window.aggregate(now, policy.window_seconds)?;
        let factors = compute_factors(&aggregate, &policy, current_replicas);
        Some((aggregate, factors))
    }

    /// `recordScalingAction(app, newCount)`.
    pub fn record_scaling_action(&self, app: &str, now: DateTime<Utc>) {
        let mut apps = self.apps.lock();
        let state = apps.entry(app.to_string()).or_default();
        state.last_scale_time = Some(now);
        state.scale_in_stable_periods = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ScalingPolicy {
        ScalingPolicy {
            min_replicas: 1,
            max_replicas: 5,
            scale_in_threshold_pct: 30.0,
            scale_out_threshold_pct: 80.0,
            window_seconds: 20,
            cooldown_seconds: 30,
            target_rps_per_replica: 50.0,
            max_p95_latency_ms: 250.0,
            max_conn_per_replica: 80.0,
            max_cpu_percent: 70.0,
            max_memory_percent: 75.0,
        }
    }

    fn sample(now: DateTime<Utc>, rps: f64) -> MetricSample {
        MetricSample {
            timestamp: now,
            requests_per_second: rps,
            p95_latency_ms: 50.0,
            active_connections: 10,
            cpu_percent: 20.0,
            memory_percent: 20.0,
        }
    }

    #[test]
    fn manual_mode_never_scales() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        let decision = scaler.evaluate("demo", 1, ScalingMode::Manual, Utc::now());
        assert!(matches!(decision, ScalingDecision::NoScale { .. }));
    }

    #[test]
    fn below_minimum_scales_up_even_without_metrics() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        let decision = scaler.evaluate("demo", 0, ScalingMode::Auto, Utc::now());
        match decision {
            ScalingDecision::Scale { target, triggered_by, .. } => {
                assert_eq!(target, 1);
                assert_eq!(triggered_by, TriggerMetric::Floor);
            }
            _ => panic!("expected a scale decision"),
        }
    }

    #[test]
    fn snapshot_returns_none_without_metrics() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        assert!(scaler.snapshot("demo", 1, Utc::now()).is_none());
    }

    #[test]
    fn snapshot_does_not_disturb_hysteresis_state() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        let now = Utc::now();
        scaler.add_metrics("demo", sample(now, 1.0));
        let (aggregate, factors) = scaler.snapshot("demo", 2, now).expect("should have metrics");
        assert_eq!(aggregate.mean_rps, 1.0);
        assert!(factors.rps_factor.is_some());
        // A read should never perturb the decision the next real evaluate() makes.
        let decision = scaler.evaluate("demo", 2, ScalingMode::Auto, now);
        assert!(matches!(decision, ScalingDecision::NoScale { reason } if reason == "metrics within thresholds"));
    }

    #[test]
    fn cooldown_blocks_scaling_after_a_recent_action() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        let now = Utc::now();
        scaler.record_scaling_action("demo", now);
        scaler.add_metrics("demo", sample(now, 1000.0));
        let decision = scaler.evaluate("demo", 2, ScalingMode::Auto, now + chrono::Duration::seconds(5));
        assert!(matches!(decision, ScalingDecision::NoScale { reason } if reason == "cooldown"));
    }

    #[test]
    fn sustained_high_rps_triggers_scale_out() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        let now = Utc::now();
        // 2 replicas * 50 target = 100 rps at-target; push well above it.
        scaler.add_metrics("demo", sample(now, 500.0));
        let decision = scaler.evaluate("demo", 2, ScalingMode::Auto, now);
        match decision {
            ScalingDecision::Scale { target, .. } => assert!(target > 2),
            other => panic!("expected scale out, got {other:?}"),
        }
    }

    #[test]
    fn scale_in_requires_three_stable_periods() {
        let scaler = Autoscaler::new();
        scaler.set_policy("demo", policy());
        let now = Utc::now();
        scaler.add_metrics("demo", sample(now, 1.0));

        let first = scaler.evaluate("demo", 3, ScalingMode::Auto, now);
        assert!(matches!(first, ScalingDecision::NoScale { .. }));
        let second = scaler.evaluate("demo", 3, ScalingMode::Auto, now);
        assert!(matches!(second, ScalingDecision::NoScale { .. }));
        let third = scaler.evaluate("demo", 3, ScalingMode::Auto, now);
        match third {
            ScalingDecision::Scale { target, .. } => assert_eq!(target, 2),
            other => panic!("expected scale in on the third stable period, got {other:?}"),
        }
    }
}
