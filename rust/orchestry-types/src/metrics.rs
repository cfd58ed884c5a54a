//! Scaling metric samples and decisions (spec.md §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed metric sample for an App, recorded at the proxy or via
/// `simulateMetrics` (spec.md §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub requests_per_second: f64,
    pub p95_latency_ms: f64,
    pub active_connections: u32,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// The per-metric scale factors computed over a policy's `windowSeconds`
/// (spec.md §4.6). Each factor is `observed / target`; a factor <= 0 means
/// the metric's target is disabled (zero target) and it is excluded from
/// the aggregate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub rps_factor: Option<f64>,
    pub latency_factor: Option<f64>,
    pub connections_factor: Option<f64>,
    pub cpu_factor: Option<f64>,
    pub memory_factor: Option<f64>,
}

impl ScaleFactors {
    /// The dominant (maximum) factor across all active metrics, per
    /// spec.md §4.6's "scale to the worst-case metric" rule. `None` if no
    /// metric produced a factor (no samples in window).
    pub fn dominant(&self) -> Option<f64> {
        [
            self.rps_factor,
            self.latency_factor,
            self.connections_factor,
            self.cpu_factor,
            self.memory_factor,
        ]
        .into_iter()
        .flatten()
        .fold(None, |acc, f| match acc {
            None => Some(f),
            Some(a) if f > a => Some(f),
            Some(a) => Some(a),
        })
    }
}

/// Aggregated window metrics fed into the scale-factor computation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowAggregate {
    pub mean_rps: f64,
    pub p95_latency_ms: f64,
    pub mean_connections: f64,
    pub mean_cpu_percent: f64,
    pub mean_memory_percent: f64,
    pub sample_count: usize,
}

/// Which metric triggered a scaling decision, for audit/event detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMetric {
    Rps,
    Latency,
    Connections,
    Cpu,
    Memory,
    Floor,
    Emergency,
}

/// The Autoscaler's decision for one tick of one App (spec.md §4.6, §9
/// Design Notes — a tagged variant rather than an inert "no-op" value).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ScalingDecision {
    /// No replica count change; `reason` names why (cooldown, no metrics,
    /// within hysteresis band, already at bound).
    NoScale { reason: String },
    /// Replica count should change to `target`.
    Scale {
        target: u32,
        reason: String,
        triggered_by: TriggerMetric,
        metrics_snapshot: WindowAggregate,
    },
}

impl ScalingDecision {
    /// The target replica count this decision implies, or `None` for `NoScale`.
    pub fn target(&self) -> Option<u32> {
        match self {
            ScalingDecision::NoScale { .. } => None,
            ScalingDecision::Scale { target, .. } => Some(*target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_picks_max_active_factor() {
        let factors = ScaleFactors {
            rps_factor: Some(0.5),
            latency_factor: Some(1.8),
            connections_factor: None,
            cpu_factor: Some(1.2),
            memory_factor: None,
        };
        assert_eq!(factors.dominant(), Some(1.8));
    }

    #[test]
    fn dominant_is_none_with_no_active_metrics() {
        assert_eq!(ScaleFactors::default().dominant(), None);
    }

    #[test]
    fn no_scale_decision_has_no_target() {
        let decision = ScalingDecision::NoScale {
            reason: "cooldown".into(),
        };
        assert_eq!(decision.target(), None);
    }
}
