//! Staged nginx upstream rendering (spec.md §4.4, Component C4).

pub mod error;
pub mod manager;
pub mod status;
pub mod template;
pub mod validation;

pub use error::{ProxyError, Result};
pub use manager::NginxManager;
pub use status::ProxyStatus;
pub use template::UpstreamServer;
