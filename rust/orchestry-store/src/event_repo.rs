//! `addEvent`/`getEvents`, `addScalingEvent`/`getScalingHistory`
//! (spec.md §4.1).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use orchestry_types::{Event, EventKind, WindowAggregate};

use crate::error::{Result, StoreError};
use crate::pool::StorePool;

fn event_kind_to_str(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Registered => "registered",
        EventKind::Started => "started",
        EventKind::Stopped => "stopped",
        EventKind::ScaledUp { .. } => "scaled_up",
        EventKind::ScaledDown { .. } => "scaled_down",
        EventKind::ReplicaFailed { .. } => "replica_failed",
        EventKind::ReplicaRestarted { .. } => "replica_restarted",
        EventKind::PolicyUpdated => "policy_updated",
        EventKind::LeaderElected { .. } => "leader_elected",
        EventKind::LeaderLost { .. } => "leader_lost",
    }
}

pub async fn add_event(pool: &Arc<StorePool>, event: &Event) -> Result<Uuid> {
    let detail = event
        .detail
        .clone()
        .or_else(|| serde_json::to_value(&event.kind).ok());
    sqlx::query(
        "INSERT INTO events (id, app_name, kind, detail, message, occurred_at) VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(event.id)
    .bind(&event.app_name)
    .bind(event_kind_to_str(&event.kind))
    .bind(&detail)
    .bind(&event.message)
    .bind(event.occurred_at)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    Ok(event.id)
}

/// `getEvents(app?, kind?, since?, limit)` — returns events matching the
/// optional filters, most recent first, bounded by `limit`.
pub async fn get_events(
    pool: &Arc<StorePool>,
    app: Option<&str>,
    kind: Option<&str>,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<Event>> {
    let rows = pool
        .read_with_fallback(|conn| {
            let app = app.map(|s| s.to_string());
            let kind = kind.map(|s| s.to_string());
            async move {
                sqlx::query(
                    r#"
                    SELECT id, app_name, kind, detail, message, occurred_at FROM events
                    WHERE ($1::text IS NULL OR app_name = $1)
                      AND ($2::text IS NULL OR kind = $2)
                      AND ($3::timestamptz IS NULL OR occurred_at >= $3)
                    ORDER BY occurred_at DESC
                    LIMIT $4
                    "#,
                )
                .bind(app)
                .bind(kind)
                .bind(since)
                .bind(limit)
                .fetch_all(&conn)
                .await
            }
        })
        .await?;

    rows.into_iter()
        .map(|row| {
            let detail: Option<Value> = row.try_get("detail").map_err(StoreError::from_sqlx)?;
            let kind_str: String = row.try_get("kind").map_err(StoreError::from_sqlx)?;
            let kind = detail
                .clone()
                .and_then(|d| serde_json::from_value::<EventKind>(d).ok())
                .unwrap_or_else(|| fallback_event_kind(&kind_str));
            Ok(Event {
                id: row.try_get("id").map_err(StoreError::from_sqlx)?,
                app_name: row.try_get("app_name").map_err(StoreError::from_sqlx)?,
                kind,
                message: row.try_get("message").map_err(StoreError::from_sqlx)?,
                detail,
                occurred_at: row.try_get("occurred_at").map_err(StoreError::from_sqlx)?,
            })
        })
        .collect()
}

fn fallback_event_kind(kind_str: &str) -> EventKind {
    match kind_str {
        "started" => EventKind::Started,
        "stopped" => EventKind::Stopped,
        "policy_updated" => EventKind::PolicyUpdated,
        _ => EventKind::Registered,
    }
}

pub async fn add_scaling_event(
    pool: &Arc<StorePool>,
    app: &str,
    from: u32,
    to: u32,
    reason: &str,
    metrics_snapshot: Option<&WindowAggregate>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let snapshot_json = metrics_snapshot
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::Unavailable(format!("failed to serialize metrics snapshot: {e}")))?;
    sqlx::query(
        "INSERT INTO scaling_history (id, app_name, from_replicas, to_replicas, reason, metrics_snapshot, occurred_at) VALUES ($1,$2,$3,$4,$5,$6, now())",
    )
    .bind(id)
    .bind(app)
    .bind(from as i32)
    .bind(to as i32)
    .bind(reason)
    .bind(&snapshot_json)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    Ok(id)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScalingHistoryEntry {
    pub id: Uuid,
    pub app_name: String,
    pub from_replicas: u32,
    pub to_replicas: u32,
    pub reason: String,
    pub metrics_snapshot: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

pub async fn get_scaling_history(
    pool: &Arc<StorePool>,
    app: &str,
    limit: i64,
) -> Result<Vec<ScalingHistoryEntry>> {
    let rows = pool
        .read_with_fallback(|conn| {
            let app = app.to_string();
            async move {
                sqlx::query(
                    "SELECT * FROM scaling_history WHERE app_name = $1 ORDER BY occurred_at DESC LIMIT $2",
                )
                .bind(app)
                .bind(limit)
                .fetch_all(&conn)
                .await
            }
        })
        .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ScalingHistoryEntry {
                id: row.try_get("id").map_err(StoreError::from_sqlx)?,
                app_name: row.try_get("app_name").map_err(StoreError::from_sqlx)?,
                from_replicas: {
                    let v: i32 = row.try_get("from_replicas").map_err(StoreError::from_sqlx)?;
                    v as u32
                },
                to_replicas: {
                    let v: i32 = row.try_get("to_replicas").map_err(StoreError::from_sqlx)?;
                    v as u32
                },
                reason: row.try_get("reason").map_err(StoreError::from_sqlx)?,
                metrics_snapshot: row.try_get("metrics_snapshot").map_err(StoreError::from_sqlx)?,
                occurred_at: row.try_get("occurred_at").map_err(StoreError::from_sqlx)?,
            })
        })
        .collect()
}
