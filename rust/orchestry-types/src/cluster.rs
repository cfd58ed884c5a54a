//! Cluster membership and leader-lease types (spec.md §3, C2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node's self-reported role in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Follower,
    Candidate,
    Leader,
    /// Shutting down; excluded from fresh-membership views.
    Stopped,
}

/// A row in the cluster membership table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterNode {
    pub node_id: String,
    pub hostname: String,
    pub state: NodeState,
    pub term: u64,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl ClusterNode {
    /// Whether this node's last heartbeat is within the freshness window
    /// used by `listFreshClusterNodes`/`purgeStaleNodes` (spec.md §4.2).
    pub fn is_fresh(&self, now: DateTime<Utc>, staleness_seconds: i64) -> bool {
        (now - self.last_heartbeat_at).num_seconds() <= staleness_seconds
    }
}

/// The fenced leader lease (spec.md §4.2). `fence_token` is monotonically
/// increasing across acquisitions and is the anti-split-brain guard: any
/// caller holding a stale token must be rejected by the Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderLease {
    pub held_by: String,
    pub term: u64,
    pub fence_token: u64,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LeaderLease {
    /// Whether the lease is still valid at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
