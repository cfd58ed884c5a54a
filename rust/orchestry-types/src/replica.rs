//! Replica/container instance types (spec.md §3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single container instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaState {
    /// Container creation requested, not yet confirmed running.
    Starting,
    /// Container running; health not yet confirmed.
    Running,
    /// Running and passing its health check.
    Healthy,
    /// Running but failing its health check.
    Unhealthy,
    /// Graceful-stop staged, draining in-flight connections.
    Stopping,
    /// Container removed.
    Stopped,
    /// Container exited unexpectedly and is a restart candidate.
    Failed,
}

impl ReplicaState {
    /// Whether the proxy should route traffic to a replica in this state.
    pub fn is_routable(&self) -> bool {
        matches!(self, ReplicaState::Healthy)
    }
}

/// A single container instance backing one replica slot of an App.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInstance {
    pub id: String,
    pub app_name: String,
    /// Stable 0-based slot index within the App's replica set.
    pub replica_index: u32,
    /// Underlying engine container id (Docker Engine API).
    pub container_id: String,
    pub state: ReplicaState,
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub consecutive_health_failures: u32,
    pub consecutive_health_successes: u32,
    pub last_health_check_at: Option<DateTime<Utc>>,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub restart_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContainerInstance {
    /// Apply one probe outcome, updating the consecutive counters used by
    /// the Health Prober's failure/success threshold logic (spec.md §4.3).
    pub fn record_probe(&mut self, healthy: bool, at: DateTime<Utc>) {
        if healthy {
            self.consecutive_health_successes += 1;
            self.consecutive_health_failures = 0;
        } else {
            self.consecutive_health_failures += 1;
            self.consecutive_health_successes = 0;
        }
        self.last_health_check_at = Some(at);
    }
}
