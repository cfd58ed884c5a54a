//! Runtime context and control-plane workers (spec.md §4.7, §5, §9,
//! Component C7): the control loop, the container monitor, and the
//! cross-node health-check sync, all composed behind one `Runtime` struct.

pub mod container_monitor;
pub mod control_loop;
pub mod error;
pub mod health_sync;
pub mod runtime;

pub use container_monitor::ContainerMonitor;
pub use control_loop::ControlLoop;
pub use error::{ControlError, Result};
pub use health_sync::HealthSyncWorker;
pub use runtime::{Runtime, RuntimeCallbacks};
