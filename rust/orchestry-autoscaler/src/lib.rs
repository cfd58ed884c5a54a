//! The Autoscaler (spec.md §4.6, Component C6): rolling metric windows and
//! a hysteresis-aware scale decision per app.

pub mod engine;
pub mod error;
pub mod factors;
pub mod window;

pub use engine::Autoscaler;
pub use error::{AutoscalerError, Result};
