//! Parses and validates the wire-format AppSpec submitted to
//! `POST /apps/register` (spec.md §6), grounded on the field set and
//! validators in `examples/original_source/app_spec/models.py`.
//!
//! The wire format uses the camelCase naming the original Python
//! `Pydantic` models and this system's documented API use
//! (`minReplicas`, `containerPort`, ...); the internal `orchestry_types`
//! structs stay idiomatic snake_case. This module is the seam between
//! them.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use orchestry_types::{
    App, AppStatus, EnvValueSource, EnvVar, HealthCheckConfig, PortProtocol, PortSpec,
    ResourceRequests, RestartPolicy, ScalingMode, ScalingPolicy, TerminationConfig,
    APP_NAME_PATTERN,
};

use crate::error::{Result, ValidationError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvVar {
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    value_from: Option<String>,
    #[serde(default)]
    sdk_key: Option<String>,
    #[serde(default)]
    secret_name: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WireResources {
    #[serde(default = "WireResources::default_cpu")]
    cpu: String,
    #[serde(default = "WireResources::default_memory")]
    memory: String,
}

impl WireResources {
    fn default_cpu() -> String {
        "100m".to_string()
    }
    fn default_memory() -> String {
        "128Mi".to_string()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePort {
    container_port: u16,
    #[serde(default)]
    protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireHealthCheck {
    #[serde(default = "WireHealthCheck::default_path")]
    path: String,
    #[serde(default)]
    initial_delay_seconds: u32,
    #[serde(default = "WireHealthCheck::default_period")]
    period_seconds: u32,
    #[serde(default = "WireHealthCheck::default_timeout")]
    timeout_seconds: u32,
    #[serde(default = "WireHealthCheck::default_failure_threshold")]
    failure_threshold: u32,
    #[serde(default = "WireHealthCheck::default_success_threshold")]
    success_threshold: u32,
}

impl WireHealthCheck {
    fn default_path() -> String {
        "/health".to_string()
    }
    fn default_period() -> u32 {
        10
    }
    fn default_timeout() -> u32 {
        5
    }
    fn default_failure_threshold() -> u32 {
        3
    }
    fn default_success_threshold() -> u32 {
        1
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireScalingPolicy {
    #[serde(default = "WireScalingPolicy::default_min")]
    min_replicas: u32,
    #[serde(default = "WireScalingPolicy::default_max")]
    max_replicas: u32,
    #[serde(default)]
    target_cpu_utilization_percentage: Option<f64>,
    #[serde(default)]
    target_memory_utilization_percentage: Option<f64>,
    #[serde(default)]
    target_rps_per_replica: Option<f64>,
    #[serde(default)]
    max_p95_latency_ms: Option<f64>,
    #[serde(default)]
    max_conn_per_replica: Option<f64>,
    #[serde(default = "WireScalingPolicy::default_scale_out")]
    scale_out_threshold_pct: f64,
    #[serde(default = "WireScalingPolicy::default_scale_in")]
    scale_in_threshold_pct: f64,
    #[serde(default = "WireScalingPolicy::default_window")]
    window_seconds: u32,
    #[serde(default = "WireScalingPolicy::default_cooldown")]
    cooldown_seconds: u32,
}

impl WireScalingPolicy {
    fn default_min() -> u32 {
        1
    }
    fn default_max() -> u32 {
        5
    }
    fn default_scale_out() -> f64 {
        80.0
    }
    fn default_scale_in() -> f64 {
        30.0
    }
    fn default_window() -> u32 {
        20
    }
    fn default_cooldown() -> u32 {
        30
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireTermination {
    #[serde(default = "WireTermination::default_drain")]
    drain_seconds: u32,
    #[serde(default = "WireTermination::default_grace")]
    termination_grace_period_seconds: u32,
}

impl WireTermination {
    fn default_drain() -> u32 {
        5
    }
    fn default_grace() -> u32 {
        30
    }
}

#[derive(Debug, Deserialize)]
struct WireMetadata {
    name: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAppSpec {
    #[serde(default = "WireAppSpec::default_api_version")]
    api_version: String,
    #[serde(default = "WireAppSpec::default_kind")]
    kind: String,
    metadata: WireMetadata,
    image: String,
    #[serde(default)]
    command: Vec<String>,
    #[serde(default)]
    env: Vec<WireEnvVar>,
    ports: Vec<WirePort>,
    #[serde(default)]
    resources: WireResources,
    #[serde(default)]
    health_check: Option<WireHealthCheck>,
    #[serde(default)]
    scaling: Option<WireScalingPolicy>,
    #[serde(default)]
    termination: WireTermination,
    #[serde(default)]
    restart_policy: Option<RestartPolicy>,
    #[serde(default)]
    mode: Option<ScalingMode>,
}

impl WireAppSpec {
    fn default_api_version() -> String {
        "v1".to_string()
    }
    fn default_kind() -> String {
        "App".to_string()
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(APP_NAME_PATTERN).expect("APP_NAME_PATTERN is a valid regex"))
}

/// Parse and validate a raw JSON app registration body into a fully
/// populated `App`, following spec.md §6's register contract.
pub fn parse_and_validate(raw: Value) -> Result<App> {
    let wire: WireAppSpec = serde_json::from_value(raw.clone())?;

    if wire.api_version != "v1" {
        return Err(ValidationError::UnsupportedApiVersion(wire.api_version));
    }
    if wire.kind != "App" {
        return Err(ValidationError::UnsupportedKind(wire.kind));
    }

    let name = wire.metadata.name;
    if name.is_empty() || name.len() > 63 || !name_pattern().is_match(&name) {
        return Err(ValidationError::InvalidName(name));
    }

    if !wire.image.contains(':') {
        return Err(ValidationError::MissingImageTag(wire.image));
    }

    if wire.ports.is_empty() {
        return Err(ValidationError::NoPorts);
    }
    let mut seen_ports = std::collections::HashSet::new();
    for port in &wire.ports {
        if !seen_ports.insert(port.container_port) {
            return Err(ValidationError::DuplicatePort(port.container_port));
        }
    }

    let mut env = Vec::with_capacity(wire.env.len());
    for e in wire.env {
        let source = match (e.value.as_deref(), e.value_from.as_deref()) {
            (Some(_), None) => EnvValueSource::Value {
                value: e.value.unwrap(),
            },
            (None, Some("sdk")) => EnvValueSource::Sdk {
                sdk_key: e
                    .sdk_key
                    .ok_or_else(|| ValidationError::AmbiguousEnvSource(e.name.clone()))?,
            },
            (None, Some("secret")) => EnvValueSource::Secret {
                secret_name: e
                    .secret_name
                    .ok_or_else(|| ValidationError::AmbiguousEnvSource(e.name.clone()))?,
                secret_key: e
                    .secret_key
                    .ok_or_else(|| ValidationError::AmbiguousEnvSource(e.name.clone()))?,
            },
            _ => return Err(ValidationError::AmbiguousEnvSource(e.name)),
        };
        env.push(EnvVar { name: e.name, source });
    }

    let ports = wire
        .ports
        .iter()
        .map(|p| PortSpec {
            container_port: p.container_port,
            protocol: match p.protocol.as_deref() {
                Some("udp") | Some("UDP") => PortProtocol::Udp,
                _ => PortProtocol::Tcp,
            },
        })
        .collect();

    let health_check = wire.health_check.map(|h| HealthCheckConfig {
        path: h.path,
        period_seconds: h.period_seconds,
        timeout_seconds: h.timeout_seconds,
        failure_threshold: h.failure_threshold,
        success_threshold: h.success_threshold,
        initial_delay_seconds: h.initial_delay_seconds,
    });

    let scaling = wire
        .scaling
        .map(|s| ScalingPolicy {
            min_replicas: s.min_replicas,
            max_replicas: s.max_replicas,
            scale_in_threshold_pct: s.scale_in_threshold_pct,
            scale_out_threshold_pct: s.scale_out_threshold_pct,
            window_seconds: s.window_seconds,
            cooldown_seconds: s.cooldown_seconds,
            target_rps_per_replica: s.target_rps_per_replica.unwrap_or(0.0),
            max_p95_latency_ms: s.max_p95_latency_ms.unwrap_or(0.0),
            max_conn_per_replica: s.max_conn_per_replica.unwrap_or(0.0),
            max_cpu_percent: s.target_cpu_utilization_percentage.unwrap_or(0.0),
            max_memory_percent: s.target_memory_utilization_percentage.unwrap_or(0.0),
        })
        .map(|policy| {
            policy
                .validate()
                .map_err(ValidationError::InvalidScalingPolicy)?;
            Ok::<_, ValidationError>(policy)
        })
        .transpose()?;

    let replicas = scaling
        .as_ref()
        .map(|s| s.min_replicas)
        .unwrap_or(ScalingPolicy::default().min_replicas);

    let now = Utc::now();
    Ok(App {
        name,
        image: wire.image,
        command: wire.command,
        env,
        ports,
        resources: ResourceRequests {
            cpu: wire.resources.cpu,
            memory: wire.resources.memory,
        },
        health_check,
        scaling,
        termination: TerminationConfig {
            drain_seconds: wire.termination.drain_seconds,
            termination_grace_period_seconds: wire.termination.termination_grace_period_seconds,
        },
        restart_policy: wire.restart_policy.unwrap_or_default(),
        labels: wire.metadata.labels,
        status: AppStatus::Registered,
        mode: wire.mode.unwrap_or(ScalingMode::Auto),
        replicas,
        created_at: now,
        updated_at: now,
        last_scaled_at: None,
        raw_spec: raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_spec() -> Value {
        json!({
            "metadata": {"name": "demo-app"},
            "image": "demo:latest",
            "ports": [{"containerPort": 8080}],
        })
    }

    #[test]
    fn parses_minimal_spec_with_defaults() {
        let app = parse_and_validate(minimal_spec()).expect("should parse");
        assert_eq!(app.name, "demo-app");
        assert_eq!(app.status, AppStatus::Registered);
        assert_eq!(app.replicas, 1);
        assert_eq!(app.resources.cpu, "100m");
    }

    #[test]
    fn rejects_invalid_name() {
        let mut spec = minimal_spec();
        spec["metadata"]["name"] = json!("-bad-name-");
        assert!(matches!(
            parse_and_validate(spec),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_image_without_tag() {
        let mut spec = minimal_spec();
        spec["image"] = json!("demo");
        assert!(matches!(
            parse_and_validate(spec),
            Err(ValidationError::MissingImageTag(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ports() {
        let mut spec = minimal_spec();
        spec["ports"] = json!([
            {"containerPort": 8080},
            {"containerPort": 8080},
        ]);
        assert!(matches!(
            parse_and_validate(spec),
            Err(ValidationError::DuplicatePort(8080))
        ));
    }

    #[test]
    fn rejects_no_ports() {
        let mut spec = minimal_spec();
        spec["ports"] = json!([]);
        assert!(matches!(parse_and_validate(spec), Err(ValidationError::NoPorts)));
    }

    #[test]
    fn raw_spec_round_trips_byte_equivalent() {
        let spec = minimal_spec();
        let app = parse_and_validate(spec.clone()).expect("should parse");
        assert_eq!(app.raw_spec, spec);
    }

    #[test]
    fn rejects_ambiguous_env_source() {
        let mut spec = minimal_spec();
        spec["env"] = json!([{"name": "FOO"}]);
        assert!(matches!(
            parse_and_validate(spec),
            Err(ValidationError::AmbiguousEnvSource(_))
        ));
    }

    #[test]
    fn accepts_sdk_sourced_env_var() {
        let mut spec = minimal_spec();
        spec["env"] = json!([{
            "name": "UPSTREAM_URL",
            "valueFrom": "sdk",
            "sdkKey": "upstream_base_url",
        }]);
        let app = parse_and_validate(spec).expect("should parse");
        assert!(matches!(
            app.env[0].source,
            EnvValueSource::Sdk { ref sdk_key } if sdk_key == "upstream_base_url"
        ));
    }
}
