//! `saveInstance`/`getInstances`/`deleteInstance`/`updateInstanceStatus`/
//! `updateInstanceHealth` (spec.md §4.1).

use std::sync::Arc;

use sqlx::Row;

use orchestry_types::{ContainerInstance, ReplicaState};

use crate::error::{Result, StoreError};
use crate::pool::StorePool;

fn state_to_str(state: ReplicaState) -> &'static str {
    match state {
        ReplicaState::Starting => "starting",
        ReplicaState::Running => "running",
        ReplicaState::Healthy => "healthy",
        ReplicaState::Unhealthy => "unhealthy",
        ReplicaState::Stopping => "stopping",
        ReplicaState::Stopped => "stopped",
        ReplicaState::Failed => "failed",
    }
}

fn state_from_str(s: &str) -> ReplicaState {
    match s {
        "running" => ReplicaState::Running,
        "healthy" => ReplicaState::Healthy,
        "unhealthy" => ReplicaState::Unhealthy,
        "stopping" => ReplicaState::Stopping,
        "stopped" => ReplicaState::Stopped,
        "failed" => ReplicaState::Failed,
        _ => ReplicaState::Starting,
    }
}

fn row_to_instance(row: sqlx::postgres::PgRow) -> Result<ContainerInstance> {
    Ok(ContainerInstance {
        id: row.try_get("id").map_err(StoreError::from_sqlx)?,
        app_name: row.try_get("app_name").map_err(StoreError::from_sqlx)?,
        replica_index: {
            let v: i32 = row.try_get("replica_index").map_err(StoreError::from_sqlx)?;
            v as u32
        },
        container_id: row.try_get("container_id").map_err(StoreError::from_sqlx)?,
        state: state_from_str(&row.try_get::<String, _>("state").map_err(StoreError::from_sqlx)?),
        host_port: {
            let v: Option<i32> = row.try_get("host_port").map_err(StoreError::from_sqlx)?;
            v.map(|p| p as u16)
        },
        container_port: {
            let v: i32 = row.try_get("container_port").map_err(StoreError::from_sqlx)?;
            v as u16
        },
        consecutive_health_failures: {
            let v: i32 = row
                .try_get("consecutive_health_failures")
                .map_err(StoreError::from_sqlx)?;
            v as u32
        },
        consecutive_health_successes: {
            let v: i32 = row
                .try_get("consecutive_health_successes")
                .map_err(StoreError::from_sqlx)?;
            v as u32
        },
        last_health_check_at: row
            .try_get("last_health_check_at")
            .map_err(StoreError::from_sqlx)?,
        cpu_percent: row.try_get("cpu_percent").map_err(StoreError::from_sqlx)?,
        memory_percent: row.try_get("memory_percent").map_err(StoreError::from_sqlx)?,
        restart_count: {
            let v: i32 = row.try_get("restart_count").map_err(StoreError::from_sqlx)?;
            v as u32
        },
        created_at: row.try_get("created_at").map_err(StoreError::from_sqlx)?,
        updated_at: row.try_get("updated_at").map_err(StoreError::from_sqlx)?,
    })
}

pub async fn save_instance(pool: &Arc<StorePool>, instance: &ContainerInstance) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO instances (
            id, app_name, replica_index, container_id, state, host_port, container_port,
            consecutive_health_failures, consecutive_health_successes, last_health_check_at,
            cpu_percent, memory_percent, restart_count, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
        ON CONFLICT (id) DO UPDATE SET
            state = EXCLUDED.state,
            host_port = EXCLUDED.host_port,
            consecutive_health_failures = EXCLUDED.consecutive_health_failures,
            consecutive_health_successes = EXCLUDED.consecutive_health_successes,
            last_health_check_at = EXCLUDED.last_health_check_at,
            cpu_percent = EXCLUDED.cpu_percent,
            memory_percent = EXCLUDED.memory_percent,
            restart_count = EXCLUDED.restart_count,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&instance.id)
    .bind(&instance.app_name)
    .bind(instance.replica_index as i32)
    .bind(&instance.container_id)
    .bind(state_to_str(instance.state))
    .bind(instance.host_port.map(|p| p as i32))
    .bind(instance.container_port as i32)
    .bind(instance.consecutive_health_failures as i32)
    .bind(instance.consecutive_health_successes as i32)
    .bind(instance.last_health_check_at)
    .bind(instance.cpu_percent)
    .bind(instance.memory_percent)
    .bind(instance.restart_count as i32)
    .bind(instance.created_at)
    .bind(instance.updated_at)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    Ok(())
}

pub async fn get_instances(
    pool: &Arc<StorePool>,
    app: &str,
    status_filter: Option<ReplicaState>,
) -> Result<Vec<ContainerInstance>> {
    let filter = status_filter.map(state_to_str);
    let rows = pool
        .read_with_fallback(|conn| {
            let app = app.to_string();
            let filter = filter.map(|s| s.to_string());
            async move {
                match filter {
                    Some(state) => {
                        sqlx::query("SELECT * FROM instances WHERE app_name = $1 AND state = $2 ORDER BY replica_index")
                            .bind(app)
                            .bind(state)
                            .fetch_all(&conn)
                            .await
                    }
                    None => {
                        sqlx::query("SELECT * FROM instances WHERE app_name = $1 ORDER BY replica_index")
                            .bind(app)
                            .fetch_all(&conn)
                            .await
                    }
                }
            }
        })
        .await?;
    rows.into_iter().map(row_to_instance).collect()
}

pub async fn delete_instance(pool: &Arc<StorePool>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM instances WHERE id = $1")
        .bind(id)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("instance {id:?}")));
    }
    Ok(())
}

pub async fn update_instance_status(pool: &Arc<StorePool>, id: &str, state: ReplicaState) -> Result<()> {
    let result = sqlx::query("UPDATE instances SET state = $1, updated_at = now() WHERE id = $2")
        .bind(state_to_str(state))
        .bind(id)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("instance {id:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_state_round_trips_through_strings() {
        for state in [
            ReplicaState::Starting,
            ReplicaState::Running,
            ReplicaState::Healthy,
            ReplicaState::Unhealthy,
            ReplicaState::Stopping,
            ReplicaState::Stopped,
            ReplicaState::Failed,
        ] {
            assert_eq!(state_from_str(state_to_str(state)), state);
        }
    }
}

pub async fn update_instance_health(
    pool: &Arc<StorePool>,
    id: &str,
    consecutive_failures: u32,
    consecutive_successes: u32,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE instances SET consecutive_health_failures = $1, consecutive_health_successes = $2, last_health_check_at = now(), updated_at = now() WHERE id = $3",
    )
    .bind(consecutive_failures as i32)
    .bind(consecutive_successes as i32)
    .bind(id)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("instance {id:?}")));
    }
    Ok(())
}
