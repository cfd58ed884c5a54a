//! Admin HTTP API (spec.md §6): a thin axum adapter over `orchestry-control`'s
//! `Runtime`, translating the core error taxonomy to status codes and owning
//! nothing else — every operation it exposes is implemented by a core crate.

pub mod error;
pub mod handlers;
pub mod leader;
pub mod models;
pub mod router;

pub use error::ApiError;
pub use router::build_router;
