//! Shared domain types and error taxonomy for Orchestry.
//!
//! Every other crate in the workspace depends on this one; it owns no
//! behavior, only the data model (spec.md §3) and the error enum every
//! crate boundary converts into (spec.md §7).

pub mod app;
pub mod cluster;
pub mod error;
pub mod event;
pub mod metrics;
pub mod replica;

pub use app::{
    App, AppStatus, EnvValueSource, EnvVar, HealthCheckConfig, PortProtocol, PortSpec,
    ResourceRequests, RestartPolicy, ScalingMode, ScalingPolicy, TerminationConfig,
    APP_NAME_PATTERN,
};
pub use cluster::{ClusterNode, LeaderLease, NodeState};
pub use error::{OrchestryError, Result};
pub use event::{Event, EventKind};
pub use metrics::{MetricSample, ScaleFactors, ScalingDecision, TriggerMetric, WindowAggregate};
pub use replica::{ContainerInstance, ReplicaState};
