use async_trait::async_trait;

use orchestry_types::ClusterNode;

/// Hooks the implementer of each subsystem wires up to respond to a node's
/// leadership transitions (spec.md §4.2's three callbacks). The Coordinator
/// itself only runs the election state machine; everything it drives lives
/// behind this trait so `orchestry-control` can compose the Replica Manager,
/// Autoscaler and Proxy Adapter without this crate depending on them.
#[async_trait]
pub trait ClusterCallbacks: Send + Sync {
    /// Fired exactly once per successful promotion to leader. Must adopt
    /// existing containers, restore per-app scaling policies, start the
    /// container-monitoring task, and clean up orphaned containers.
    async fn on_become_leader(&self);

    /// Fired when a leader demotes itself (failed renewal or shutdown).
    /// Must stop the container-monitoring task; read-only API serving
    /// continues regardless.
    async fn on_lose_leadership(&self);

    /// Advisory notification of the current fresh cluster membership view.
    async fn on_cluster_change(&self, nodes: Vec<ClusterNode>);
}

/// A callbacks implementation that does nothing, for tests and for nodes
/// that only ever run as followers (read-only API replicas).
pub struct NoopCallbacks;

#[async_trait]
impl ClusterCallbacks for NoopCallbacks {
    async fn on_become_leader(&self) {}
    async fn on_lose_leadership(&self) {}
    async fn on_cluster_change(&self, _nodes: Vec<ClusterNode>) {}
}
