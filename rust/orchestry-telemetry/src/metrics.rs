//! The Prometheus metrics registry published by `orchestry-control`
//! (spec.md §1, §11). Each field is a real `prometheus` collector,
//! replacing the hand-rolled sample-vec exporter the teacher's workflow
//! engine used for the same concern (see DESIGN.md).

use prometheus::{Gauge, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("prometheus registration failed: {0}")]
    Registration(#[from] prometheus::Error),
}

/// All collectors the core publishes, grouped behind one handle so every
/// worker loop shares a single `Registry`.
pub struct Metrics {
    pub registry: Registry,
    /// Count of scaling decisions, labeled by app and direction (`scale_up`/`scale_down`/`no_scale`).
    pub scaling_decisions_total: IntCounterVec,
    /// Control loop tick duration in seconds, labeled by phase.
    pub control_loop_tick_seconds: HistogramVec,
    /// 1.0 if this node currently holds the leader lease, else 0.0.
    pub leader_status: Gauge,
    /// Current replica count per app.
    pub app_replicas: GaugeVec,
    /// Consecutive health-check failures per replica.
    pub health_check_failures_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let scaling_decisions_total = IntCounterVec::new(
            Opts::new(
                "orchestry_scaling_decisions_total",
                "Count of autoscaler decisions by app and direction",
            ),
            &["app", "direction"],
        )?;
        registry.register(Box::new(scaling_decisions_total.clone()))?;

        let control_loop_tick_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "orchestry_control_loop_tick_seconds",
                "Duration of each control loop phase",
            ),
            &["phase"],
        )?;
        registry.register(Box::new(control_loop_tick_seconds.clone()))?;

        let leader_status = Gauge::new(
            "orchestry_leader_status",
            "1 if this node holds the leader lease, else 0",
        )?;
        registry.register(Box::new(leader_status.clone()))?;

        let app_replicas = GaugeVec::new(
            Opts::new("orchestry_app_replicas", "Current replica count per app"),
            &["app"],
        )?;
        registry.register(Box::new(app_replicas.clone()))?;

        let health_check_failures_total = IntCounterVec::new(
            Opts::new(
                "orchestry_health_check_failures_total",
                "Consecutive health check failures observed per replica",
            ),
            &["app", "replica_index"],
        )?;
        registry.register(Box::new(health_check_failures_total.clone()))?;

        Ok(Self {
            registry,
            scaling_decisions_total,
            control_loop_tick_seconds,
            leader_status,
            app_replicas,
            health_check_failures_total,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(MetricsError::Registration)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_without_duplicate_collector_error() {
        let metrics = Metrics::new().expect("registry should build");
        metrics
            .scaling_decisions_total
            .with_label_values(&["demo", "scale_up"])
            .inc();
        let text = metrics.encode().expect("should encode");
        assert!(text.contains("orchestry_scaling_decisions_total"));
    }
}
