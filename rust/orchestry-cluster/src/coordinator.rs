//! The election loop itself (spec.md §4.2). Grounded on
//! `knhk-autonomic::AutonomicController`'s `AtomicBool` running flag plus
//! `tokio::time::interval` ticker, with the `Arc<RwLock<Component>>` fan-out
//! collapsed to a single `parking_lot::RwLock<NodeState>` since there is only
//! one piece of mutable state to serialize here.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use orchestry_store::Store;
use orchestry_types::{ClusterNode, NodeState};

use crate::callbacks::ClusterCallbacks;
use crate::config::CoordinatorConfig;
use crate::error::{ClusterError, Result};
use crate::state::{transition, Event};

/// Runs the per-node election state machine against the State Store. One
/// instance per process; `orchestry-control`'s `Runtime` owns it.
pub struct Coordinator {
    store: Store,
    config: CoordinatorConfig,
    state: RwLock<NodeState>,
    term: AtomicU64,
    running: AtomicBool,
    callbacks: Arc<dyn ClusterCallbacks>,
}

impl Coordinator {
    pub fn new(store: Store, config: CoordinatorConfig, callbacks: Arc<dyn ClusterCallbacks>) -> Self {
        Self {
            store,
            config,
            state: RwLock::new(NodeState::Follower),
            term: AtomicU64::new(0),
            running: AtomicBool::new(false),
            callbacks,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    pub fn current_state(&self) -> NodeState {
        *self.state.read()
    }

    pub fn current_term(&self) -> u64 {
        self.term.load(Ordering::SeqCst)
    }

    pub fn is_leader(&self) -> bool {
        self.current_state() == NodeState::Leader
    }

    fn set_state(&self, new: NodeState) {
        *self.state.write() = new;
    }

    /// Drives the state machine until `shutdown()` is called. Intended to be
    /// spawned as its own task by the caller.
    #[instrument(skip(self), fields(node_id = %self.config.node_id))]
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ClusterError::AlreadyStarted);
        }

        info!(
            ttl_secs = self.config.lease_ttl.as_secs(),
            heartbeat_secs = self.config.heartbeat_interval.as_secs(),
            "cluster coordinator starting"
        );

        let mut ticker = tokio::time::interval(self.config.election_check_interval);
        let mut last_heartbeat = Instant::now()
            .checked_sub(self.config.heartbeat_interval)
            .unwrap_or_else(Instant::now);

        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.tick(&mut last_heartbeat).await {
                warn!(error = %err, "coordinator tick failed");
            }
        }

        info!("cluster coordinator stopped");
        Ok(())
    }

    /// Best-effort graceful shutdown: release the lease if held, stop the
    /// loop, and transition to `stopped`.
    pub async fn shutdown(&self) {
        if self.current_state() == NodeState::Leader {
            let term = self.current_term();
            if let Err(err) = self.store.release_lease(&self.config.node_id, term).await {
                warn!(error = %err, "failed to release lease on shutdown");
            }
            self.callbacks.on_lose_leadership().await;
        }
        self.running.store(false, Ordering::SeqCst);
        self.set_state(transition(self.current_state(), Event::Shutdown));
    }

    async fn tick(&self, last_heartbeat: &mut Instant) -> Result<()> {
        self.heartbeat_membership().await?;

        match self.current_state() {
            NodeState::Follower => self.check_for_stale_lease().await?,
            NodeState::Candidate => self.try_become_leader().await?,
            NodeState::Leader => {
                if last_heartbeat.elapsed() >= self.config.heartbeat_interval {
                    self.renew_lease().await?;
                    *last_heartbeat = Instant::now();
                }
                let pruned = self
                    .store
                    .purge_stale_nodes(
                        self.config.stale_node_prune_after.as_secs() as i64,
                        &self.config.node_id,
                    )
                    .await?;
                if pruned > 0 {
                    debug!(pruned, "pruned stale cluster nodes");
                }
            }
            NodeState::Stopped => {}
        }

        let nodes = self.store.list_fresh_cluster_nodes(self.config.lease_ttl.as_secs() as i64).await?;
        self.callbacks.on_cluster_change(nodes).await;

        Ok(())
    }

    async fn heartbeat_membership(&self) -> Result<()> {
        self.store
            .upsert_cluster_node(&ClusterNode {
                node_id: self.config.node_id.clone(),
                hostname: self.config.hostname.clone(),
                state: self.current_state(),
                term: self.current_term(),
                last_heartbeat_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    async fn check_for_stale_lease(&self) -> Result<()> {
        let lease = self.store.get_lease().await?;
        let now = Utc::now();
        let stale = lease.as_ref().map(|l| !l.is_valid(now)).unwrap_or(true);
        if stale {
            debug!("no valid lease observed, becoming candidate");
            self.set_state(transition(NodeState::Follower, Event::HeartbeatTimeout));
            self.try_become_leader().await?;
        }
        Ok(())
    }

    async fn try_become_leader(&self) -> Result<()> {
        let next_term = self.term.fetch_add(1, Ordering::SeqCst) + 1;
        let acquired = self
            .store
            .acquire_or_renew_lease(
                &self.config.node_id,
                next_term,
                self.config.lease_ttl,
                &self.config.hostname,
                &self.config.advertise_url,
            )
            .await?;

        if acquired {
            self.set_state(transition(NodeState::Candidate, Event::LeaseAcquired));
            info!(term = next_term, "became leader");
            self.store
                .append_cluster_event(&self.config.node_id, "leader_elected", None, next_term)
                .await?;
            self.callbacks.on_become_leader().await;
        } else {
            self.set_state(transition(NodeState::Candidate, Event::LeaseLost));
        }
        Ok(())
    }

    async fn renew_lease(&self) -> Result<()> {
        let term = self.current_term();
        let renewed = self
            .store
            .acquire_or_renew_lease(
                &self.config.node_id,
                term,
                self.config.lease_ttl,
                &self.config.hostname,
                &self.config.advertise_url,
            )
            .await?;

        if !renewed {
            warn!(term, "lease renewal failed, demoting self");
            self.set_state(transition(NodeState::Leader, Event::LeaseLost));
            self.store
                .append_cluster_event(&self.config.node_id, "leader_lost", None, term)
                .await?;
            self.callbacks.on_lose_leadership().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::NoopCallbacks;

    fn make_config() -> CoordinatorConfig {
        CoordinatorConfig::new("node-1", "host-1", "http://host-1:9000")
    }

    #[test]
    fn new_coordinator_starts_as_follower_at_term_zero() {
        // Constructing a Coordinator needs a live Store, which needs a
        // reachable Postgres endpoint; the state-machine bookkeeping that
        // doesn't touch the store is exercised directly in state.rs and
        // here indirectly via the CoordinatorConfig invariant check.
        let cfg = make_config();
        assert!(cfg.is_valid());
        let _ = NoopCallbacks;
    }
}
