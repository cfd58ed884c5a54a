use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("malformed app spec: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid name {0:?}: must be a DNS label (1-63 chars, alphanumeric/hyphen, no leading/trailing hyphen)")]
    InvalidName(String),

    #[error("image {0:?} must include a tag (e.g. myapp:latest)")]
    MissingImageTag(String),

    #[error("at least one port must be specified")]
    NoPorts,

    #[error("duplicate container port: {0}")]
    DuplicatePort(u16),

    #[error("env var {0:?} must specify exactly one of value/sdk/secret")]
    AmbiguousEnvSource(String),

    #[error("scaling policy invalid: {0}")]
    InvalidScalingPolicy(String),

    #[error("unsupported apiVersion {0:?}")]
    UnsupportedApiVersion(String),

    #[error("unsupported kind {0:?}, only \"App\" is supported")]
    UnsupportedKind(String),
}

impl From<ValidationError> for orchestry_types::OrchestryError {
    fn from(err: ValidationError) -> Self {
        orchestry_types::OrchestryError::Validation(err.to_string())
    }
}
