use thiserror::Error;

pub type Result<T> = std::result::Result<T, AutoscalerError>;

/// The Autoscaler is pure in-memory computation; its only failure mode is
/// being asked about an app it has never seen metrics or a policy for.
#[derive(Error, Debug)]
pub enum AutoscalerError {
    #[error("no scaling policy set for app {0}")]
    NoPolicy(String),
}

impl From<AutoscalerError> for orchestry_types::OrchestryError {
    fn from(err: AutoscalerError) -> Self {
        match err {
            AutoscalerError::NoPolicy(app) => orchestry_types::OrchestryError::NotFound(app),
        }
    }
}
