//! The error taxonomy surfaced by every core crate.
//!
//! Each subsystem crate (`orchestry-store`, `orchestry-cluster`, ...) owns a
//! component-local error enum and converts into [`OrchestryError`] at its
//! public boundary, the way `knhk-autonomic::AutonomicError` wraps
//! monitor/analyze/plan/execute detail into one crate-level error. Only the
//! outermost HTTP adapter (`orchestry-api`) translates this taxonomy into
//! status codes.

use thiserror::Error;

/// Result alias used at crate boundaries throughout the core.
pub type Result<T> = std::result::Result<T, OrchestryError>;

/// The error kinds named in spec.md §7.
#[derive(Error, Debug)]
pub enum OrchestryError {
    /// Malformed app spec, invalid port/resource, invalid name.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown app / replica / lease.
    #[error("not found: {0}")]
    NotFound(String),

    /// Lease race, duplicate app name at registration.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Both primary and replica store endpoints unreachable or failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Container engine reported a failure.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Proxy config validation or reload failed.
    #[error("proxy error: {0}")]
    Proxy(String),

    /// Mutating call received by a follower.
    #[error("not leader, current leader: {current_leader:?}")]
    NotLeader {
        /// Best-known current leader, if any.
        current_leader: Option<String>,
    },

    /// Timeout or partial failure; safe to retry.
    #[error("transient error: {0}")]
    Transient(String),
}

impl OrchestryError {
    /// Whether a caller may safely retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestryError::Transient(_) | OrchestryError::StoreUnavailable(_)
        )
    }
}
