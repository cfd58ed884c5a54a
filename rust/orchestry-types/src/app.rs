//! The App entity and its embedded ScalingPolicy (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lifecycle state of a registered App.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    /// Registered but never started.
    Registered,
    /// Desired replica set is being actuated.
    Running,
    /// Explicitly stopped; zero replicas.
    Stopped,
    /// Terminal-recoverable error state.
    Error,
}

/// Whether the Autoscaler is allowed to act on this App.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// The Autoscaler may change replica count.
    Auto,
    /// Replica count changes only via explicit operator action.
    Manual,
}

/// How an environment variable's value is sourced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvValueSource {
    /// A literal value.
    Value { value: String },
    /// Sourced from another app's SDK-exposed config at render time.
    Sdk { sdk_key: String },
    /// Sourced from a secret store reference.
    Secret { secret_name: String, secret_key: String },
}

/// A single container environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(flatten)]
    pub source: EnvValueSource,
}

/// A single exposed container port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PortSpec {
    pub container_port: u16,
    #[serde(default)]
    pub protocol: PortProtocol,
}

/// Transport protocol for a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

/// CPU/memory resource request for each replica.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequests {
    /// Decimal ("0.5") or millicore-suffixed ("500m") CPU request.
    pub cpu: String,
    /// Mi-suffixed memory request, e.g. "256Mi".
    pub memory: String,
}

/// Per-replica HTTP health-check configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub path: String,
    #[serde(default = "HealthCheckConfig::default_period_seconds")]
    pub period_seconds: u32,
    #[serde(default = "HealthCheckConfig::default_timeout_seconds")]
    pub timeout_seconds: u32,
    #[serde(default = "HealthCheckConfig::default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "HealthCheckConfig::default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default)]
    pub initial_delay_seconds: u32,
}

impl HealthCheckConfig {
    fn default_period_seconds() -> u32 {
        10
    }
    fn default_timeout_seconds() -> u32 {
        5
    }
    fn default_failure_threshold() -> u32 {
        3
    }
    fn default_success_threshold() -> u32 {
        1
    }
}

/// Graceful-teardown timing, advisory except where the Replica Manager
/// consumes it directly (stop grace period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationConfig {
    #[serde(default = "TerminationConfig::default_drain_seconds")]
    pub drain_seconds: u32,
    #[serde(default = "TerminationConfig::default_grace_seconds")]
    pub termination_grace_period_seconds: u32,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            drain_seconds: Self::default_drain_seconds(),
            termination_grace_period_seconds: Self::default_grace_seconds(),
        }
    }
}

impl TerminationConfig {
    fn default_drain_seconds() -> u32 {
        5
    }
    fn default_grace_seconds() -> u32 {
        30
    }
}

/// User-facing restart policy. Advisory only — the Replica Manager's own
/// restart sweep (spec.md §4.5) is authoritative (spec.md §9 Open Questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

/// Per-metric targets; a zero target disables that metric (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub scale_in_threshold_pct: f64,
    pub scale_out_threshold_pct: f64,
    pub window_seconds: u32,
    pub cooldown_seconds: u32,
    pub target_rps_per_replica: f64,
    pub max_p95_latency_ms: f64,
    pub max_conn_per_replica: f64,
    pub max_cpu_percent: f64,
    pub max_memory_percent: f64,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        // Mirrors the defaults in the original controller/scaler.py.
        Self {
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
}

impl ScalingPolicy {
    /// Validate the invariants named in spec.md §3.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_replicas < 1 {
            return Err("minReplicas must be >= 1".into());
        }
        if self.max_replicas < self.min_replicas {
            return Err(format!(
                "maxReplicas ({}) must be >= minReplicas ({})",
                self.max_replicas, self.min_replicas
            ));
        }
        if !(self.scale_in_threshold_pct < self.scale_out_threshold_pct) {
            return Err("scaleInThresholdPct must be < scaleOutThresholdPct".into());
        }
        if !(self.scale_out_threshold_pct > 0.0 && self.scale_out_threshold_pct <= 100.0) {
            return Err("scaleOutThresholdPct must be in (0, 100]".into());
        }
        if !(self.scale_in_threshold_pct > 0.0 && self.scale_in_threshold_pct <= 100.0) {
            return Err("scaleInThresholdPct must be in (0, 100]".into());
        }
        if self.window_seconds < 1 {
            return Err("windowSeconds must be >= 1".into());
        }
        if self.max_cpu_percent <= 0.0 || self.max_cpu_percent > 100.0 {
            return Err("maxCPUPercent must be in (0, 100]".into());
        }
        if self.max_memory_percent <= 0.0 || self.max_memory_percent > 100.0 {
            return Err("maxMemoryPercent must be in (0, 100]".into());
        }
        Ok(())
    }
}

/// The App entity (spec.md §3). `raw_spec` preserves the exact submitted
/// JSON for byte-equivalent round trip via `GET /apps/{name}/raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    pub ports: Vec<PortSpec>,
    pub resources: ResourceRequests,
    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,
    #[serde(default)]
    pub scaling: Option<ScalingPolicy>,
    #[serde(default)]
    pub termination: TerminationConfig,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub status: AppStatus,
    pub mode: ScalingMode,
    pub replicas: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_scaled_at: Option<DateTime<Utc>>,
    /// The exact JSON body POSTed to `/apps/register`, for round-trip.
    pub raw_spec: Value,
}

/// The DNS-label name regex named in spec.md §6.
pub const APP_NAME_PATTERN: &str = r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?$";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_internally_consistent() {
        assert!(ScalingPolicy::default().validate().is_ok());
    }

    #[test]
    fn rejects_max_below_min() {
        let policy = ScalingPolicy {
            min_replicas: 3,
            max_replicas: 2,
            ..ScalingPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn rejects_scale_in_above_scale_out() {
        let policy = ScalingPolicy {
            scale_in_threshold_pct: 90.0,
            scale_out_threshold_pct: 80.0,
            ..ScalingPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn rejects_zero_min_replicas() {
        let policy = ScalingPolicy {
            min_replicas: 0,
            ..ScalingPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
