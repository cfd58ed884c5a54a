use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Glue error type for `orchestry-control`: every subsystem error converts
/// here via `?`, and this converts into [`orchestry_types::OrchestryError`]
/// at the HTTP adapter boundary the same way each subsystem crate converts
/// into it at its own boundary.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Core(#[from] orchestry_types::OrchestryError),

    #[error(transparent)]
    Store(#[from] orchestry_store::StoreError),

    #[error(transparent)]
    Cluster(#[from] orchestry_cluster::ClusterError),

    #[error(transparent)]
    Replica(#[from] orchestry_replica::ReplicaError),

    #[error(transparent)]
    Proxy(#[from] orchestry_proxy::ProxyError),

    #[error(transparent)]
    Health(#[from] orchestry_health::HealthError),

    #[error(transparent)]
    Autoscaler(#[from] orchestry_autoscaler::AutoscalerError),

    #[error(transparent)]
    Validation(#[from] orchestry_validation::ValidationError),

    #[error("config error: {0}")]
    Config(String),
}

impl From<ControlError> for orchestry_types::OrchestryError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Core(e) => e,
            ControlError::Store(e) => e.into(),
            ControlError::Cluster(e) => e.into(),
            ControlError::Replica(e) => e.into(),
            ControlError::Proxy(e) => e.into(),
            ControlError::Health(e) => e.into(),
            ControlError::Autoscaler(e) => e.into(),
            ControlError::Validation(e) => e.into(),
            ControlError::Config(msg) => orchestry_types::OrchestryError::Runtime(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_maps_to_runtime() {
        let err: orchestry_types::OrchestryError = ControlError::Config("bad env".to_string()).into();
        assert!(matches!(err, orchestry_types::OrchestryError::Runtime(msg) if msg == "bad env"));
    }
}
