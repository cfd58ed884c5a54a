//! AppSpec parsing and validation for Orchestry (spec.md §6).

pub mod error;
pub mod spec;

pub use error::{Result, ValidationError};
pub use spec::parse_and_validate;
