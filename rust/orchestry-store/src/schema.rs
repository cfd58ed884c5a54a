//! DDL for the store's relational schema (spec.md §4.1 Design rules:
//! JSON-blob columns for nested structures, indexed columns for anything
//! queried directly).

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS apps (
    name TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    mode TEXT NOT NULL,
    replicas INTEGER NOT NULL,
    spec JSONB NOT NULL,
    raw_spec JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    last_scaled_at TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS idx_apps_status ON apps (status);

CREATE TABLE IF NOT EXISTS instances (
    id TEXT PRIMARY KEY,
    app_name TEXT NOT NULL REFERENCES apps (name) ON DELETE CASCADE,
    replica_index INTEGER NOT NULL,
    container_id TEXT NOT NULL,
    state TEXT NOT NULL,
    host_port INTEGER,
    container_port INTEGER NOT NULL,
    consecutive_health_failures INTEGER NOT NULL DEFAULT 0,
    consecutive_health_successes INTEGER NOT NULL DEFAULT 0,
    last_health_check_at TIMESTAMPTZ,
    cpu_percent DOUBLE PRECISION,
    memory_percent DOUBLE PRECISION,
    restart_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_instances_app ON instances (app_name);

CREATE TABLE IF NOT EXISTS events (
    id UUID PRIMARY KEY,
    app_name TEXT,
    kind TEXT NOT NULL,
    detail JSONB,
    message TEXT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_app_time ON events (app_name, occurred_at);

CREATE TABLE IF NOT EXISTS scaling_history (
    id UUID PRIMARY KEY,
    app_name TEXT NOT NULL,
    from_replicas INTEGER NOT NULL,
    to_replicas INTEGER NOT NULL,
    reason TEXT NOT NULL,
    metrics_snapshot JSONB,
    occurred_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scaling_app_time ON scaling_history (app_name, occurred_at);

CREATE TABLE IF NOT EXISTS leader_lease (
    id INTEGER PRIMARY KEY DEFAULT 1,
    held_by TEXT NOT NULL,
    term BIGINT NOT NULL,
    fence_token BIGINT NOT NULL,
    acquired_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT single_row CHECK (id = 1)
);

CREATE TABLE IF NOT EXISTS cluster_nodes (
    node_id TEXT PRIMARY KEY,
    hostname TEXT NOT NULL,
    state TEXT NOT NULL,
    term BIGINT NOT NULL,
    last_heartbeat_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cluster_nodes_heartbeat ON cluster_nodes (last_heartbeat_at);

CREATE TABLE IF NOT EXISTS cluster_events (
    id UUID PRIMARY KEY,
    node_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    data JSONB,
    term BIGINT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL
);
"#;

/// Apply the schema. Idempotent; safe to call on every startup.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
