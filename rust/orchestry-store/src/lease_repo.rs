//! Fenced-lease and cluster-membership operations (spec.md §4.1, §4.2).

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use orchestry_types::{ClusterNode, LeaderLease, NodeState};

use crate::error::{Result, StoreError};
use crate::pool::StorePool;

fn node_state_to_str(state: NodeState) -> &'static str {
    match state {
        NodeState::Follower => "follower",
        NodeState::Candidate => "candidate",
        NodeState::Leader => "leader",
        NodeState::Stopped => "stopped",
    }
}

fn node_state_from_str(s: &str) -> NodeState {
    match s {
        "candidate" => NodeState::Candidate,
        "leader" => NodeState::Leader,
        "stopped" => NodeState::Stopped,
        _ => NodeState::Follower,
    }
}

/// Atomically acquire the lease if unheld/expired, or renew it if already
/// held by `candidate_id` at `term`. Uses a single `UPDATE ... OR INSERT`
/// style upsert guarded by a `WHERE` clause so the fence token only
/// advances on a genuine acquisition, never a renewal, per spec.md §4.2's
/// anti-split-brain requirement.
pub async fn acquire_or_renew_lease(
    pool: &Arc<StorePool>,
    candidate_id: &str,
    term: u64,
    ttl: std::time::Duration,
    _hostname: &str,
    _url: &str,
) -> Result<bool> {
    let now = Utc::now();
    let expires_at = now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::seconds(10));

    let mut tx = pool.writer().begin().await.map_err(|e| pool.map_write_err(e))?;

    let existing = sqlx::query("SELECT held_by, term, fence_token, expires_at FROM leader_lease WHERE id = 1 FOR UPDATE")
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| pool.map_write_err(e))?;

    let acquired = match existing {
        None => {
            sqlx::query(
                "INSERT INTO leader_lease (id, held_by, term, fence_token, acquired_at, expires_at) VALUES (1, $1, $2, 1, $3, $4)",
            )
            .bind(candidate_id)
            .bind(term as i64)
            .bind(now)
            .bind(expires_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| pool.map_write_err(e))?;
            true
        }
        Some(row) => {
            let held_by: String = row.try_get("held_by").map_err(StoreError::from_sqlx)?;
            let existing_term: i64 = row.try_get("term").map_err(StoreError::from_sqlx)?;
            let existing_fence: i64 = row.try_get("fence_token").map_err(StoreError::from_sqlx)?;
            let existing_expires: DateTime<Utc> = row.try_get("expires_at").map_err(StoreError::from_sqlx)?;

            if held_by == candidate_id && existing_term == term as i64 {
                sqlx::query("UPDATE leader_lease SET expires_at = $1 WHERE id = 1")
                    .bind(expires_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| pool.map_write_err(e))?;
                true
            } else if existing_expires <= now || existing_term < term as i64 {
                sqlx::query(
                    "UPDATE leader_lease SET held_by = $1, term = $2, fence_token = $3, acquired_at = $4, expires_at = $5 WHERE id = 1",
                )
                .bind(candidate_id)
                .bind(term as i64)
                .bind(existing_fence + 1)
                .bind(now)
                .bind(expires_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| pool.map_write_err(e))?;
                true
            } else {
                false
            }
        }
    };

    tx.commit().await.map_err(|e| pool.map_write_err(e))?;
    Ok(acquired)
}

pub async fn release_lease(pool: &Arc<StorePool>, candidate_id: &str, term: u64) -> Result<()> {
    sqlx::query("DELETE FROM leader_lease WHERE id = 1 AND held_by = $1 AND term = $2")
        .bind(candidate_id)
        .bind(term as i64)
        .execute(pool.writer())
        .await
        .map_err(|e| pool.map_write_err(e))?;
    Ok(())
}

pub async fn get_lease(pool: &Arc<StorePool>) -> Result<Option<LeaderLease>> {
    let row = pool
        .read_with_fallback(|conn| async move {
            sqlx::query("SELECT held_by, term, fence_token, acquired_at, expires_at FROM leader_lease WHERE id = 1")
                .fetch_optional(&conn)
                .await
        })
        .await?;

    row.map(|row| {
        Ok(LeaderLease {
            held_by: row.try_get("held_by").map_err(StoreError::from_sqlx)?,
            term: {
                let v: i64 = row.try_get("term").map_err(StoreError::from_sqlx)?;
                v as u64
            },
            fence_token: {
                let v: i64 = row.try_get("fence_token").map_err(StoreError::from_sqlx)?;
                v as u64
            },
            acquired_at: row.try_get("acquired_at").map_err(StoreError::from_sqlx)?,
            expires_at: row.try_get("expires_at").map_err(StoreError::from_sqlx)?,
        })
    })
    .transpose()
}

pub async fn upsert_cluster_node(pool: &Arc<StorePool>, node: &ClusterNode) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cluster_nodes (node_id, hostname, state, term, last_heartbeat_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (node_id) DO UPDATE SET
            hostname = EXCLUDED.hostname,
            state = EXCLUDED.state,
            term = EXCLUDED.term,
            last_heartbeat_at = EXCLUDED.last_heartbeat_at
        "#,
    )
    .bind(&node.node_id)
    .bind(&node.hostname)
    .bind(node_state_to_str(node.state))
    .bind(node.term as i64)
    .bind(node.last_heartbeat_at)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    Ok(())
}

pub async fn list_fresh_cluster_nodes(pool: &Arc<StorePool>, within_sec: i64) -> Result<Vec<ClusterNode>> {
    let rows = pool
        .read_with_fallback(|conn| async move {
            sqlx::query(
                "SELECT node_id, hostname, state, term, last_heartbeat_at FROM cluster_nodes WHERE last_heartbeat_at >= now() - ($1 || ' seconds')::interval ORDER BY node_id",
            )
            .bind(within_sec)
            .fetch_all(&conn)
            .await
        })
        .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ClusterNode {
                node_id: row.try_get("node_id").map_err(StoreError::from_sqlx)?,
                hostname: row.try_get("hostname").map_err(StoreError::from_sqlx)?,
                state: node_state_from_str(&row.try_get::<String, _>("state").map_err(StoreError::from_sqlx)?),
                term: {
                    let v: i64 = row.try_get("term").map_err(StoreError::from_sqlx)?;
                    v as u64
                },
                last_heartbeat_at: row.try_get("last_heartbeat_at").map_err(StoreError::from_sqlx)?,
            })
        })
        .collect()
}

pub async fn purge_stale_nodes(pool: &Arc<StorePool>, older_than_sec: i64, except_id: &str) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM cluster_nodes WHERE last_heartbeat_at < now() - ($1 || ' seconds')::interval AND node_id != $2",
    )
    .bind(older_than_sec)
    .bind(except_id)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    Ok(result.rows_affected())
}

pub async fn append_cluster_event(
    pool: &Arc<StorePool>,
    node_id: &str,
    kind: &str,
    data: Option<Value>,
    term: u64,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO cluster_events (id, node_id, kind, data, term, occurred_at) VALUES ($1,$2,$3,$4,$5, now())",
    )
    .bind(id)
    .bind(node_id)
    .bind(kind)
    .bind(&data)
    .bind(term as i64)
    .execute(pool.writer())
    .await
    .map_err(|e| pool.map_write_err(e))?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_state_round_trips_through_strings() {
        for state in [
            NodeState::Follower,
            NodeState::Candidate,
            NodeState::Leader,
            NodeState::Stopped,
        ] {
            assert_eq!(node_state_from_str(node_state_to_str(state)), state);
        }
    }
}
