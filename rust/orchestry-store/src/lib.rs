//! Postgres-backed State Store (spec.md §4.1, Component C1).
//!
//! `Store` is a thin facade over the per-entity repo modules, holding the
//! shared `StorePool`. Grounded on `knhk-consensus::state::CommandLog`'s
//! `Arc<DashMap<_>>`-backed concurrency discipline generalized to real
//! persistence, and on `mz-stash`'s role as Materialize's durable
//! metadata store.

pub mod app_repo;
pub mod error;
pub mod event_repo;
pub mod instance_repo;
pub mod lease_repo;
pub mod pool;
pub mod retry;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use orchestry_types::{
    App, AppStatus, ClusterNode, ContainerInstance, Event, LeaderLease, ReplicaState,
    WindowAggregate,
};
use uuid::Uuid;

pub use error::{Result, StoreError};
pub use event_repo::ScalingHistoryEntry;
pub use pool::StorePool;

/// The facade every other crate depends on; each method maps 1:1 onto an
/// operation named in spec.md §4.1.
#[derive(Clone)]
pub struct Store {
    pool: Arc<StorePool>,
}

impl Store {
    pub async fn connect(primary_url: &str, replica_url: Option<&str>) -> Result<Self> {
        let pool = Arc::new(StorePool::connect(primary_url, replica_url).await?);
        schema::migrate(pool.writer()).await.map_err(StoreError::from_sqlx)?;
        pool.spawn_reprobe_task();
        Ok(Self { pool })
    }

    pub async fn save_app(&self, app: &App) -> Result<()> {
        app_repo::save_app(&self.pool, app).await
    }

    pub async fn get_app(&self, name: &str) -> Result<App> {
        app_repo::get_app(&self.pool, name).await
    }

    pub async fn list_apps(&self, status_filter: Option<AppStatus>) -> Result<Vec<App>> {
        app_repo::list_apps(&self.pool, status_filter).await
    }

    pub async fn delete_app(&self, name: &str) -> Result<()> {
        app_repo::delete_app(&self.pool, name).await
    }

    pub async fn update_app_status(&self, name: &str, status: AppStatus) -> Result<()> {
        app_repo::update_app_status(&self.pool, name, status).await
    }

    pub async fn update_app_replicas(&self, name: &str, replicas: u32) -> Result<()> {
        app_repo::update_app_replicas(&self.pool, name, replicas).await
    }

    pub async fn save_instance(&self, instance: &ContainerInstance) -> Result<()> {
        instance_repo::save_instance(&self.pool, instance).await
    }

    pub async fn get_instances(
        &self,
        app: &str,
        status_filter: Option<ReplicaState>,
    ) -> Result<Vec<ContainerInstance>> {
        instance_repo::get_instances(&self.pool, app, status_filter).await
    }

    pub async fn delete_instance(&self, id: &str) -> Result<()> {
        instance_repo::delete_instance(&self.pool, id).await
    }

    pub async fn update_instance_status(&self, id: &str, state: ReplicaState) -> Result<()> {
        instance_repo::update_instance_status(&self.pool, id, state).await
    }

    pub async fn update_instance_health(
        &self,
        id: &str,
        consecutive_failures: u32,
        consecutive_successes: u32,
    ) -> Result<()> {
        instance_repo::update_instance_health(&self.pool, id, consecutive_failures, consecutive_successes).await
    }

    pub async fn add_event(&self, event: &Event) -> Result<Uuid> {
        event_repo::add_event(&self.pool, event).await
    }

    pub async fn get_events(
        &self,
        app: Option<&str>,
        kind: Option<&str>,
        since: Option<chrono::DateTime<chrono::Utc>>,
        limit: i64,
    ) -> Result<Vec<Event>> {
        event_repo::get_events(&self.pool, app, kind, since, limit).await
    }

    pub async fn add_scaling_event(
        &self,
        app: &str,
        from: u32,
        to: u32,
        reason: &str,
        metrics_snapshot: Option<&WindowAggregate>,
    ) -> Result<Uuid> {
        event_repo::add_scaling_event(&self.pool, app, from, to, reason, metrics_snapshot).await
    }

    pub async fn get_scaling_history(&self, app: &str, limit: i64) -> Result<Vec<ScalingHistoryEntry>> {
        event_repo::get_scaling_history(&self.pool, app, limit).await
    }

    pub async fn acquire_or_renew_lease(
        &self,
        candidate_id: &str,
        term: u64,
        ttl: Duration,
        hostname: &str,
        url: &str,
    ) -> Result<bool> {
        lease_repo::acquire_or_renew_lease(&self.pool, candidate_id, term, ttl, hostname, url).await
    }

    pub async fn release_lease(&self, candidate_id: &str, term: u64) -> Result<()> {
        lease_repo::release_lease(&self.pool, candidate_id, term).await
    }

    pub async fn get_lease(&self) -> Result<Option<LeaderLease>> {
        lease_repo::get_lease(&self.pool).await
    }

    pub async fn upsert_cluster_node(&self, node: &ClusterNode) -> Result<()> {
        lease_repo::upsert_cluster_node(&self.pool, node).await
    }

    pub async fn list_fresh_cluster_nodes(&self, within_sec: i64) -> Result<Vec<ClusterNode>> {
        lease_repo::list_fresh_cluster_nodes(&self.pool, within_sec).await
    }

    pub async fn purge_stale_nodes(&self, older_than_sec: i64, except_id: &str) -> Result<u64> {
        lease_repo::purge_stale_nodes(&self.pool, older_than_sec, except_id).await
    }

    pub async fn append_cluster_event(
        &self,
        node_id: &str,
        kind: &str,
        data: Option<serde_json::Value>,
        term: u64,
    ) -> Result<Uuid> {
        lease_repo::append_cluster_event(&self.pool, node_id, kind, data, term).await
    }
}
