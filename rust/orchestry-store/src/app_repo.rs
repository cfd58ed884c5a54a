//! `saveApp`/`getApp`/`listApps`/`deleteApp`/`updateAppStatus`/
//! `updateAppReplicas` (spec.md §4.1).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;

use orchestry_types::{
    App, AppStatus, EnvVar, HealthCheckConfig, PortSpec, ResourceRequests, RestartPolicy,
    ScalingMode, ScalingPolicy, TerminationConfig,
};

use crate::error::{Result, StoreError};
use crate::pool::StorePool;
use crate::retry::{with_retry, RetryConfig};

/// Everything about an App beyond its primary key / status / replica
/// count / timestamps, serialized into the `spec` JSONB column.
#[derive(Debug, Serialize, Deserialize)]
struct AppSpecBlob {
    image: String,
    command: Vec<String>,
    env: Vec<EnvVar>,
    ports: Vec<PortSpec>,
    resources: ResourceRequests,
    health_check: Option<HealthCheckConfig>,
    scaling: Option<ScalingPolicy>,
    termination: TerminationConfig,
    restart_policy: RestartPolicy,
    labels: std::collections::HashMap<String, String>,
}

fn status_to_str(status: AppStatus) -> &'static str {
    match status {
        AppStatus::Registered => "registered",
        AppStatus::Running => "running",
        AppStatus::Stopped => "stopped",
        AppStatus::Error => "error",
    }
}

fn status_from_str(s: &str) -> AppStatus {
    match s {
        "running" => AppStatus::Running,
        "stopped" => AppStatus::Stopped,
        "error" => AppStatus::Error,
        _ => AppStatus::Registered,
    }
}

fn mode_to_str(mode: ScalingMode) -> &'static str {
    match mode {
        ScalingMode::Auto => "auto",
        ScalingMode::Manual => "manual",
    }
}

fn mode_from_str(s: &str) -> ScalingMode {
    match s {
        "manual" => ScalingMode::Manual,
        _ => ScalingMode::Auto,
    }
}

fn row_to_app(
    name: String,
    status: String,
    mode: String,
    replicas: i32,
    spec: Value,
    raw_spec: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_scaled_at: Option<DateTime<Utc>>,
) -> Result<App> {
    let blob: AppSpecBlob = serde_json::from_value(spec)
        .map_err(|e| StoreError::Unavailable(format!("corrupt app spec blob: {e}")))?;
    Ok(App {
        name,
        image: blob.image,
        command: blob.command,
        env: blob.env,
        ports: blob.ports,
        resources: blob.resources,
        health_check: blob.health_check,
        scaling: blob.scaling,
        termination: blob.termination,
        restart_policy: blob.restart_policy,
        labels: blob.labels,
        status: status_from_str(&status),
        mode: mode_from_str(&mode),
        replicas: replicas as u32,
        created_at,
        updated_at,
        last_scaled_at,
        raw_spec,
    })
}

pub async fn save_app(pool: &Arc<StorePool>, app: &App) -> Result<()> {
    let blob = AppSpecBlob {
        image: app.image.clone(),
        command: app.command.clone(),
        env: app.env.clone(),
        ports: app.ports.clone(),
        resources: app.resources.clone(),
        health_check: app.health_check.clone(),
        scaling: app.scaling.clone(),
        termination: app.termination.clone(),
        restart_policy: app.restart_policy,
        labels: app.labels.clone(),
    };
    let spec_json = serde_json::to_value(&blob)
        .map_err(|e| StoreError::Unavailable(format!("failed to serialize app spec: {e}")))?;

    with_retry(RetryConfig::default(), || async {
        sqlx::query(
            r#"
            INSERT INTO apps (name, status, mode, replicas, spec, raw_spec, created_at, updated_at, last_scaled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (name) DO UPDATE SET
                status = EXCLUDED.status,
                mode = EXCLUDED.mode,
                replicas = EXCLUDED.replicas,
                spec = EXCLUDED.spec,
                raw_spec = EXCLUDED.raw_spec,
                updated_at = EXCLUDED.updated_at,
                last_scaled_at = EXCLUDED.last_scaled_at
            "#,
        )
        .bind(&app.name)
        .bind(status_to_str(app.status))
        .bind(mode_to_str(app.mode))
        .bind(app.replicas as i32)
        .bind(&spec_json)
        .bind(&app.raw_spec)
        .bind(app.created_at)
        .bind(app.updated_at)
        .bind(app.last_scaled_at)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))
    })
    .await?;
    Ok(())
}

pub async fn get_app(pool: &Arc<StorePool>, name: &str) -> Result<App> {
    let row = pool
        .read_with_fallback(|conn| {
            let name = name.to_string();
            async move {
                sqlx::query(
                    "SELECT name, status, mode, replicas, spec, raw_spec, created_at, updated_at, last_scaled_at FROM apps WHERE name = $1",
                )
                .bind(name)
                .fetch_one(&conn)
                .await
            }
        })
        .await?;

    row_to_app(
        row.try_get("name").map_err(StoreError::from_sqlx)?,
        row.try_get("status").map_err(StoreError::from_sqlx)?,
        row.try_get("mode").map_err(StoreError::from_sqlx)?,
        row.try_get("replicas").map_err(StoreError::from_sqlx)?,
        row.try_get("spec").map_err(StoreError::from_sqlx)?,
        row.try_get("raw_spec").map_err(StoreError::from_sqlx)?,
        row.try_get("created_at").map_err(StoreError::from_sqlx)?,
        row.try_get("updated_at").map_err(StoreError::from_sqlx)?,
        row.try_get("last_scaled_at").map_err(StoreError::from_sqlx)?,
    )
}

pub async fn list_apps(pool: &Arc<StorePool>, status_filter: Option<AppStatus>) -> Result<Vec<App>> {
    let filter = status_filter.map(status_to_str);
    let rows = pool
        .read_with_fallback(|conn| {
            let filter = filter.map(|s| s.to_string());
            async move {
                match filter {
                    Some(status) => {
                        sqlx::query(
                            "SELECT name, status, mode, replicas, spec, raw_spec, created_at, updated_at, last_scaled_at FROM apps WHERE status = $1 ORDER BY name",
                        )
                        .bind(status)
                        .fetch_all(&conn)
                        .await
                    }
                    None => {
                        sqlx::query(
                            "SELECT name, status, mode, replicas, spec, raw_spec, created_at, updated_at, last_scaled_at FROM apps ORDER BY name",
                        )
                        .fetch_all(&conn)
                        .await
                    }
                }
            }
        })
        .await?;

    rows.into_iter()
        .map(|row| {
            row_to_app(
                row.try_get("name").map_err(StoreError::from_sqlx)?,
                row.try_get("status").map_err(StoreError::from_sqlx)?,
                row.try_get("mode").map_err(StoreError::from_sqlx)?,
                row.try_get("replicas").map_err(StoreError::from_sqlx)?,
                row.try_get("spec").map_err(StoreError::from_sqlx)?,
                row.try_get("raw_spec").map_err(StoreError::from_sqlx)?,
                row.try_get("created_at").map_err(StoreError::from_sqlx)?,
                row.try_get("updated_at").map_err(StoreError::from_sqlx)?,
                row.try_get("last_scaled_at").map_err(StoreError::from_sqlx)?,
            )
        })
        .collect()
}

pub async fn delete_app(pool: &Arc<StorePool>, name: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM apps WHERE name = $1")
        .bind(name)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("app {name:?}")));
    }
    Ok(())
}

pub async fn update_app_status(pool: &Arc<StorePool>, name: &str, status: AppStatus) -> Result<()> {
    let result = sqlx::query("UPDATE apps SET status = $1, updated_at = now() WHERE name = $2")
        .bind(status_to_str(status))
        .bind(name)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("app {name:?}")));
    }
    Ok(())
}

pub async fn update_app_replicas(pool: &Arc<StorePool>, name: &str, replicas: u32) -> Result<()> {
    let result = sqlx::query("UPDATE apps SET replicas = $1, updated_at = now(), last_scaled_at = now() WHERE name = $2")
        .bind(replicas as i32)
        .bind(name)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("app {name:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            AppStatus::Registered,
            AppStatus::Running,
            AppStatus::Stopped,
            AppStatus::Error,
        ] {
            assert_eq!(status_from_str(status_to_str(status)), status);
        }
    }

    #[test]
    fn mode_round_trips_through_strings() {
        for mode in [ScalingMode::Auto, ScalingMode::Manual] {
            assert_eq!(mode_from_str(mode_to_str(mode)), mode);
        }
    }
}
