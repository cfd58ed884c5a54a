//! Handler functions for every endpoint in spec.md §6's table. Each takes
//! the shared `Arc<Runtime>` as axum `State` and returns `Result<Json<_>,
//! ApiError>`; leader-required handlers call [`require_leader`] first.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use orchestry_control::Runtime;
use orchestry_types::{Event, EventKind, MetricSample, OrchestryError, ScalingDecision};

use crate::error::ApiError;
use crate::leader::require_leader;
use crate::models::*;

pub async fn register_app(
    State(runtime): State<Arc<Runtime>>,
    Json(raw): Json<Value>,
) -> Result<Json<RegisterResponse>, ApiError> {
    require_leader(&runtime).await?;

    let app = orchestry_validation::parse_and_validate(raw)?;

    if runtime.store.get_app(&app.name).await.is_ok() {
        return Err(OrchestryError::Conflict(format!("app {} already registered", app.name)).into());
    }

    runtime.replicas.register(app.clone()).await?;
    let saved = runtime.store.get_app(&app.name).await?;
    Ok(Json(RegisterResponse { status: "registered", app: saved }))
}

pub async fn up_app(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_leader(&runtime).await?;
    runtime.replicas.start(&name).await?;
    Ok(Json(serde_json::json!({ "status": "started", "app": name })))
}

pub async fn down_app(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_leader(&runtime).await?;
    runtime.replicas.stop(&name).await?;
    Ok(Json(serde_json::json!({ "status": "stopped", "app": name })))
}

pub async fn app_status(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
) -> Result<Json<AppStatusResponse>, ApiError> {
    let app = runtime.store.get_app(&name).await?;
    let snapshot = runtime.replicas.status(&name).await?;
    Ok(Json(AppStatusResponse {
        app: name,
        status: app.status,
        mode: app.mode,
        replicas: snapshot.replicas.len() as u32,
        ready_replicas: snapshot.ready_replicas,
        instances: snapshot.replicas,
    }))
}

pub async fn scale_app(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
    Json(body): Json<ScaleRequest>,
) -> Result<Json<Value>, ApiError> {
    require_leader(&runtime).await?;
    if body.replicas > 100 {
        return Err(OrchestryError::Validation("replicas must be 0..=100".to_string()).into());
    }
    runtime.replicas.scale(&name, body.replicas).await?;
    Ok(Json(serde_json::json!({ "status": "scaled", "app": name, "replicas": body.replicas })))
}

pub async fn set_policy(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
    Json(body): Json<PolicyRequest>,
) -> Result<Json<Value>, ApiError> {
    require_leader(&runtime).await?;
    body.policy.validate().map_err(OrchestryError::Validation)?;

    let mut app = runtime.store.get_app(&name).await?;
    app.scaling = Some(body.policy.clone());
    app.updated_at = Utc::now();
    runtime.store.save_app(&app).await?;
    runtime.autoscaler.set_policy(&name, body.policy);

    runtime
        .store
        .add_event(&Event {
            id: uuid::Uuid::new_v4(),
            app_name: Some(name.clone()),
            kind: EventKind::PolicyUpdated,
            message: format!("scaling policy updated for {name}"),
            detail: None,
            occurred_at: Utc::now(),
        })
        .await?;

    Ok(Json(serde_json::json!({ "status": "updated", "app": name })))
}

pub async fn list_apps(
    State(runtime): State<Arc<Runtime>>,
) -> Result<Json<Vec<AppListEntry>>, ApiError> {
    let apps = runtime.store.list_apps(None).await?;
    let mut entries = Vec::with_capacity(apps.len());
    for app in apps {
        let snapshot = runtime.replicas.status(&app.name).await?;
        entries.push(AppListEntry {
            name: app.name,
            status: app.status,
            mode: app.mode,
            replicas: snapshot.replicas.len() as u32,
            ready_replicas: snapshot.ready_replicas,
        });
    }
    Ok(Json(entries))
}

pub async fn raw_spec(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
) -> Result<Json<RawResponse>, ApiError> {
    let app = runtime.store.get_app(&name).await?;
    Ok(Json(RawResponse { raw: app.raw_spec.clone(), parsed: app }))
}

pub async fn app_metrics(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
) -> Result<Json<AppMetricsResponse>, ApiError> {
    let snapshot = runtime.replicas.status(&name).await?;
    let replica_count = snapshot.replicas.len() as u32;
    let (aggregate, scale_factors) = match runtime.autoscaler.snapshot(&name, replica_count, Utc::now()) {
        Some((a, f)) => (Some(a), Some(f)),
        None => (None, None),
    };
    let scaling_history = runtime.store.get_scaling_history(&name, 10).await?;
    Ok(Json(AppMetricsResponse { app: name, aggregate, scale_factors, scaling_history }))
}

pub async fn simulate_metrics(
    State(runtime): State<Arc<Runtime>>,
    Path(name): Path<String>,
    Json(body): Json<SimulateMetricsRequest>,
) -> Result<Json<SimulateMetricsResponse>, ApiError> {
    require_leader(&runtime).await?;

    let app = runtime.store.get_app(&name).await?;
    let snapshot = runtime.replicas.status(&name).await?;
    let current_replicas = snapshot.replicas.len() as u32;

    let sample = MetricSample {
        timestamp: Utc::now(),
        requests_per_second: body.rps,
        p95_latency_ms: body.p95_latency_ms,
        active_connections: body.active_connections,
        cpu_percent: body.cpu_percent,
        memory_percent: body.memory_percent,
    };
    runtime.autoscaler.add_metrics(&name, sample.clone());

    let evaluation = if body.evaluate {
        let decision = runtime.autoscaler.evaluate(&name, current_replicas, app.mode, Utc::now());
        let (should_scale, target_replicas, reason) = match &decision {
            ScalingDecision::Scale { target, reason, .. } => (true, Some(*target), reason.clone()),
            ScalingDecision::NoScale { reason } => (false, None, reason.clone()),
        };

        let action = if let ScalingDecision::Scale { target, reason, .. } = &decision {
            if *target != current_replicas {
                runtime.replicas.scale_with_reason(&name, *target, reason).await?;
                runtime.autoscaler.record_scaling_action(&name, Utc::now());
                Some(ScaleActionSummary { from: current_replicas, to: *target })
            } else {
                None
            }
        } else {
            None
        };

        Some(EvaluationSummary { should_scale, target_replicas, reason, action })
    } else {
        None
    };

    Ok(Json(SimulateMetricsResponse { app: name, metrics_added: sample, evaluation }))
}

pub async fn global_metrics(
    State(runtime): State<Arc<Runtime>>,
) -> Result<Json<GlobalMetricsResponse>, ApiError> {
    let apps = runtime.store.list_apps(None).await?;
    let mut running = 0usize;
    let mut total_instances = 0usize;
    let mut healthy_instances = 0usize;

    for app in &apps {
        let snapshot = runtime.replicas.status(&app.name).await?;
        if !snapshot.replicas.is_empty() {
            running += 1;
            total_instances += snapshot.replicas.len();
            healthy_instances += snapshot.ready_replicas as usize;
        }
    }

    let nginx = runtime.proxy.get_proxy_status().await?;

    Ok(Json(GlobalMetricsResponse {
        timestamp: Utc::now(),
        apps: AppsSummary { total: apps.len(), running },
        instances: InstancesSummary {
            total: total_instances,
            healthy: healthy_instances,
            unhealthy: total_instances - healthy_instances,
        },
        nginx,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    app: Option<String>,
    kind: Option<String>,
    #[serde(default = "default_events_limit")]
    limit: i64,
}

fn default_events_limit() -> i64 {
    100
}

pub async fn list_events(
    State(runtime): State<Arc<Runtime>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = runtime
        .store
        .get_events(query.app.as_deref(), query.kind.as_deref(), None, query.limit)
        .await?;
    Ok(Json(EventsResponse { events }))
}

pub async fn cluster_status(
    State(runtime): State<Arc<Runtime>>,
) -> Result<Json<ClusterStatusResponse>, ApiError> {
    let nodes = runtime.store.list_fresh_cluster_nodes(30).await?;
    Ok(Json(ClusterStatusResponse {
        node_id: runtime.coordinator.node_id().to_string(),
        hostname: runtime.coordinator.hostname().to_string(),
        state: runtime.coordinator.current_state(),
        term: runtime.coordinator.current_term(),
        is_leader: runtime.coordinator.is_leader(),
        nodes,
    }))
}

pub async fn cluster_leader(
    State(runtime): State<Arc<Runtime>>,
) -> Result<Json<ClusterLeaderResponse>, ApiError> {
    let lease = runtime.store.get_lease().await?;
    match lease {
        Some(lease) => Ok(Json(ClusterLeaderResponse {
            held_by: lease.held_by,
            term: lease.term,
            acquired_at: lease.acquired_at,
            expires_at: lease.expires_at,
        })),
        None => Err(OrchestryError::Transient("no leader elected".to_string()).into()),
    }
}

pub async fn cluster_health(
    State(runtime): State<Arc<Runtime>>,
) -> Result<Json<ClusterHealthResponse>, ApiError> {
    let lease = runtime.store.get_lease().await.ok().flatten();
    let nodes = runtime.store.list_fresh_cluster_nodes(30).await.unwrap_or_default();
    Ok(Json(ClusterHealthResponse {
        status: if lease.is_some() { "healthy" } else { "degraded" },
        node_id: runtime.coordinator.node_id().to_string(),
        state: runtime.coordinator.current_state(),
        is_leader: runtime.coordinator.is_leader(),
        leader_id: lease.map(|l| l.held_by),
        cluster_size: nodes.len(),
    }))
}

pub async fn health(State(runtime): State<Arc<Runtime>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: if runtime.is_running() { "ok" } else { "shutting_down" } })
}

/// Not part of spec.md §6's table; exposed for infra scraping the way the
/// teacher's otel-carrying crates do, under a path that doesn't collide
/// with the admin `/metrics` JSON snapshot.
pub async fn prometheus_metrics(State(runtime): State<Arc<Runtime>>) -> Result<String, ApiError> {
    runtime
        .metrics
        .encode()
        .map_err(|e| OrchestryError::Runtime(e.to_string()).into())
}
