use thiserror::Error;

pub type Result<T> = std::result::Result<T, HealthError>;

#[derive(Error, Debug, Clone)]
pub enum HealthError {
    #[error("store unavailable: {0}")]
    Store(String),
}

impl From<orchestry_store::StoreError> for HealthError {
    fn from(err: orchestry_store::StoreError) -> Self {
        HealthError::Store(err.to_string())
    }
}

impl From<HealthError> for orchestry_types::OrchestryError {
    fn from(err: HealthError) -> Self {
        match err {
            HealthError::Store(msg) => orchestry_types::OrchestryError::StoreUnavailable(msg),
        }
    }
}
