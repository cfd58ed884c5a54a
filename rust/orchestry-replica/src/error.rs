use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplicaError>;

/// Failure taxonomy for the Replica Manager (spec.md §4.5). Config-level
/// errors fail whole operations; runtime errors on a single replica are
/// caught and logged by the caller instead of propagated through this type.
#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("invalid resource spec: {0}")]
    InvalidSpec(String),

    #[error("container engine error: {0}")]
    Runtime(#[from] bollard::errors::Error),

    #[error("store error: {0}")]
    Store(#[from] orchestry_store::StoreError),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ReplicaError> for orchestry_types::OrchestryError {
    fn from(err: ReplicaError) -> Self {
        match err {
            ReplicaError::InvalidSpec(msg) => orchestry_types::OrchestryError::Validation(msg),
            ReplicaError::Runtime(err) => orchestry_types::OrchestryError::Runtime(err.to_string()),
            ReplicaError::Store(err) => err.into(),
            ReplicaError::NotFound(msg) => orchestry_types::OrchestryError::NotFound(msg),
        }
    }
}
