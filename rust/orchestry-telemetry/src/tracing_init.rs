//! `tracing`/`tracing-subscriber` initialization, grounded on the
//! `EnvFilter` + `fmt::layer()` registry wiring used throughout the
//! teacher's own CLI and autonomic-system crates, with the OTel export
//! layer dropped (see DESIGN.md).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// ANSI-colored compact output for local development.
    Compact,
    /// Newline-delimited JSON for production log aggregation.
    Json,
}

/// Initialize the global tracing subscriber. Reads `RUST_LOG` via
/// `EnvFilter`, defaulting to `info` when unset.
///
/// # Panics
/// Panics if called more than once per process (`tracing`'s own
/// guarantee); callers should invoke this exactly once at process start.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Compact => {
            registry
                .with(fmt::layer().with_target(false).with_thread_ids(false))
                .init();
        }
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_target(true)).init();
        }
    }
}
