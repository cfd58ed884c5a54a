//! Wire DTOs for the admin HTTP API (spec.md §6). These are deliberately
//! separate from the core `orchestry_types` entities: the API's JSON shape
//! is a presentation concern, not a domain one.

use chrono::{DateTime, Utc};
use orchestry_types::{App, AppStatus, ScalingPolicy, ScalingMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub app: App,
}

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub replicas: u32,
}

#[derive(Debug, Deserialize)]
pub struct PolicyRequest {
    pub policy: ScalingPolicy,
}

#[derive(Debug, Serialize)]
pub struct AppListEntry {
    pub name: String,
    pub status: AppStatus,
    pub mode: ScalingMode,
    pub replicas: u32,
    pub ready_replicas: u32,
}

#[derive(Debug, Serialize)]
pub struct AppStatusResponse {
    pub app: String,
    pub status: AppStatus,
    pub mode: ScalingMode,
    pub replicas: u32,
    pub ready_replicas: u32,
    pub instances: Vec<orchestry_types::ContainerInstance>,
}

#[derive(Debug, Serialize)]
pub struct RawResponse {
    pub raw: Value,
    pub parsed: App,
}

#[derive(Debug, Deserialize, Default)]
pub struct SimulateMetricsRequest {
    #[serde(default)]
    pub rps: f64,
    #[serde(default, rename = "p95LatencyMs")]
    pub p95_latency_ms: f64,
    #[serde(default, rename = "activeConnections")]
    pub active_connections: u32,
    #[serde(default, rename = "cpuPercent")]
    pub cpu_percent: f64,
    #[serde(default, rename = "memoryPercent")]
    pub memory_percent: f64,
    #[serde(default = "default_true")]
    pub evaluate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SimulateMetricsResponse {
    pub app: String,
    pub metrics_added: orchestry_types::MetricSample,
    pub evaluation: Option<EvaluationSummary>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationSummary {
    pub should_scale: bool,
    pub target_replicas: Option<u32>,
    pub reason: String,
    pub action: Option<ScaleActionSummary>,
}

#[derive(Debug, Serialize)]
pub struct ScaleActionSummary {
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<orchestry_types::Event>,
}

#[derive(Debug, Serialize)]
pub struct ClusterStatusResponse {
    pub node_id: String,
    pub hostname: String,
    pub state: orchestry_types::NodeState,
    pub term: u64,
    pub is_leader: bool,
    pub nodes: Vec<orchestry_types::ClusterNode>,
}

#[derive(Debug, Serialize)]
pub struct ClusterLeaderResponse {
    pub held_by: String,
    pub term: u64,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ClusterHealthResponse {
    pub status: &'static str,
    pub node_id: String,
    pub state: orchestry_types::NodeState,
    pub is_leader: bool,
    pub leader_id: Option<String>,
    pub cluster_size: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GlobalMetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub apps: AppsSummary,
    pub instances: InstancesSummary,
    pub nginx: orchestry_proxy::ProxyStatus,
}

#[derive(Debug, Serialize)]
pub struct AppsSummary {
    pub total: usize,
    pub running: usize,
}

#[derive(Debug, Serialize)]
pub struct InstancesSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

#[derive(Debug, Serialize)]
pub struct AppMetricsResponse {
    pub app: String,
    pub aggregate: Option<orchestry_types::WindowAggregate>,
    pub scale_factors: Option<orchestry_types::ScaleFactors>,
    pub scaling_history: Vec<orchestry_store::ScalingHistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_metrics_request_accepts_camel_case_fields() {
        let body = r#"{
            "rps": 120.5,
            "p95LatencyMs": 340.0,
            "activeConnections": 12,
            "cpuPercent": 55.0,
            "memoryPercent": 70.0
        }"#;
        let req: SimulateMetricsRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.rps, 120.5);
        assert_eq!(req.p95_latency_ms, 340.0);
        assert_eq!(req.active_connections, 12);
        assert_eq!(req.cpu_percent, 55.0);
        assert_eq!(req.memory_percent, 70.0);
        assert!(req.evaluate);
    }

    #[test]
    fn simulate_metrics_request_fields_default_to_zero() {
        let req: SimulateMetricsRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.rps, 0.0);
        assert_eq!(req.active_connections, 0);
        assert!(req.evaluate);
    }

    #[test]
    fn simulate_metrics_request_evaluate_can_be_disabled() {
        let req: SimulateMetricsRequest = serde_json::from_str(r#"{"evaluate": false}"#).unwrap();
        assert!(!req.evaluate);
    }
}
