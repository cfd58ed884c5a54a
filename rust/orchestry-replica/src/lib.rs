//! The Replica Manager (spec.md §4.5, Component C5): container lifecycle
//! actuation and reconciliation against the Docker Engine API, with the
//! nginx upstream set kept in lock-step via `orchestry-proxy`.

pub mod docker;
pub mod error;
pub mod index;
pub mod labels;
pub mod manager;
pub mod resources;

pub use docker::{ContainerView, DockerRuntime, StatsSample};
pub use error::{ReplicaError, Result};
pub use index::ReplicaIndex;
pub use manager::{AppHealth, AppStatusSnapshot, ReplicaManager};
