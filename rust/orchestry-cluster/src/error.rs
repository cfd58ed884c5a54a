use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Failure taxonomy for the Cluster Coordinator (spec.md §4.2).
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    #[error("store unavailable: {0}")]
    Store(String),

    #[error("this node is not the leader; current leader is {current_leader:?}")]
    NotLeader { current_leader: Option<String> },

    #[error("coordinator already started")]
    AlreadyStarted,
}

impl From<orchestry_store::StoreError> for ClusterError {
    fn from(err: orchestry_store::StoreError) -> Self {
        ClusterError::Store(err.to_string())
    }
}

impl From<ClusterError> for orchestry_types::OrchestryError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Store(msg) => orchestry_types::OrchestryError::StoreUnavailable(msg),
            ClusterError::NotLeader { current_leader } => {
                orchestry_types::OrchestryError::NotLeader { current_leader }
            }
            ClusterError::AlreadyStarted => {
                orchestry_types::OrchestryError::Runtime("coordinator already started".to_string())
            }
        }
    }
}
