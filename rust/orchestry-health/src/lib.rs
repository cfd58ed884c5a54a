//! Per-replica HTTP health probing (spec.md §4.3, Component C3).

pub mod error;
pub mod probe;
pub mod prober;
pub mod target;

pub use error::{HealthError, Result};
pub use prober::{HealthProber, Transition};
pub use target::ProbeTarget;
