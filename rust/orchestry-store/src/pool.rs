//! Primary/replica connection pool with read routing and a background
//! re-probe loop for a suspected-failed primary (spec.md §4.1), grounded
//! on the `DatabaseReplicationManager` shape in the pack's
//! `database-replication.rs` examples (health-gated pool selection behind
//! an `RwLock`, failure counters) and on the original `state/db.py`'s
//! re-probe interval (SPEC_FULL.md §12).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::{Result, StoreError};

const REPROBE_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POOL_CONNECTIONS: u32 = 10;

/// Holds a primary pool and, when configured, a read-only replica pool.
/// Reads prefer the replica; any replica error falls back to the primary.
/// Writes always go to the primary.
pub struct StorePool {
    primary: PgPool,
    replica: Option<PgPool>,
    primary_suspected_failed: Arc<AtomicBool>,
}

impl StorePool {
    pub async fn connect(primary_url: &str, replica_url: Option<&str>) -> Result<Self> {
        let primary = PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect(primary_url)
            .await
            .map_err(StoreError::from_sqlx)?;

        let replica = match replica_url {
            Some(url) => Some(
                PgPoolOptions::new()
                    .max_connections(MAX_POOL_CONNECTIONS)
                    .connect(url)
                    .await
                    .map_err(StoreError::from_sqlx)?,
            ),
            None => None,
        };

        Ok(Self {
            primary,
            replica,
            primary_suspected_failed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The pool to use for writes; always the primary.
    pub fn writer(&self) -> &PgPool {
        &self.primary
    }

    /// The pool to use for reads: the replica if one is configured and the
    /// primary is not currently suspected failed, else the primary.
    pub fn reader(&self) -> &PgPool {
        match &self.replica {
            Some(replica) if !self.primary_suspected_failed.load(Ordering::Relaxed) => replica,
            _ => &self.primary,
        }
    }

    /// Run a read-only query against the reader pool, falling back to the
    /// primary transparently on any error (spec.md §4.1 "Read routing").
    pub async fn read_with_fallback<T, F, Fut>(&self, query: F) -> Result<T>
    where
        F: Fn(PgPool) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        if let Some(replica) = &self.replica {
            if !self.primary_suspected_failed.load(Ordering::Relaxed) {
                match query(replica.clone()).await {
                    Ok(value) => return Ok(value),
                    Err(err) => {
                        warn!(%err, "replica read failed, falling back to primary");
                    }
                }
            }
        }
        query(self.primary.clone()).await.map_err(StoreError::from_sqlx)
    }

    pub fn mark_primary_suspected_failed(&self) {
        if !self.primary_suspected_failed.swap(true, Ordering::Relaxed) {
            warn!("primary marked suspected-failed, routing reads to replica only");
        }
    }

    /// Map a write-path sqlx error to a `StoreError`, marking the primary
    /// suspected-failed first (spec.md §4.1 "mark primary suspected-failed
    /// on write/read failure"). Every repo write call site maps its writer
    /// errors through this instead of `StoreError::from_sqlx` directly so
    /// the re-probe loop actually has something to clear.
    pub fn map_write_err(&self, err: sqlx::Error) -> StoreError {
        self.mark_primary_suspected_failed();
        StoreError::from_sqlx(err)
    }

    /// Spawn the background re-probe task that clears the suspected-failed
    /// flag once the primary answers a trivial query again.
    pub fn spawn_reprobe_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REPROBE_INTERVAL);
            loop {
                interval.tick().await;
                if !this.primary_suspected_failed.load(Ordering::Relaxed) {
                    continue;
                }
                if sqlx::query("SELECT 1").execute(&this.primary).await.is_ok() {
                    this.primary_suspected_failed.store(false, Ordering::Relaxed);
                    info!("primary re-probe succeeded, resuming normal read routing");
                }
            }
        })
    }
}
