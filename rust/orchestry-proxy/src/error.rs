use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Failure taxonomy for the Proxy Adapter (spec.md §4.4).
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("invalid app name: {0}")]
    InvalidAppName(String),

    #[error("invalid upstream server: {0}")]
    InvalidServer(String),

    #[error("config write failed: {0}")]
    Io(String),

    #[error("config validation failed: {0}")]
    ValidationFailed(String),

    #[error("reload failed: {0}")]
    ReloadFailed(String),

    #[error("status endpoint unreachable: {0}")]
    StatusUnavailable(String),
}

impl From<ProxyError> for orchestry_types::OrchestryError {
    fn from(err: ProxyError) -> Self {
        orchestry_types::OrchestryError::Proxy(err.to_string())
    }
}
