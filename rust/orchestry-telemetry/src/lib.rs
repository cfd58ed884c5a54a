//! Tracing initialization and the shared Prometheus metrics registry
//! (spec.md §11).

pub mod metrics;
pub mod tracing_init;

pub use metrics::{Metrics, MetricsError};
pub use tracing_init::{init_tracing, LogFormat};
