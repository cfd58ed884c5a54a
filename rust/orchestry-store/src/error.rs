use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// The failure taxonomy named in spec.md §4.1.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("no reachable store endpoint: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error, retryable: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Serialization(_) | StoreError::Unavailable(_))
    }

    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                // Postgres SQLSTATE 40001 (serialization_failure) and 40P01
                // (deadlock_detected) are both retryable per spec.md §4.1.
                match db_err.code().as_deref() {
                    Some("40001") | Some("40P01") => {
                        StoreError::Serialization(db_err.message().to_string())
                    }
                    Some("23505") => StoreError::Conflict(db_err.message().to_string()),
                    _ => StoreError::Unavailable(err.to_string()),
                }
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from_sqlx(err)
    }
}

impl From<StoreError> for orchestry_types::OrchestryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => orchestry_types::OrchestryError::StoreUnavailable(msg),
            StoreError::NotFound(msg) => orchestry_types::OrchestryError::NotFound(msg),
            StoreError::Conflict(msg) => orchestry_types::OrchestryError::Conflict(msg),
            StoreError::Serialization(msg) => orchestry_types::OrchestryError::Transient(msg),
        }
    }
}
