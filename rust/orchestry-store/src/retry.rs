//! Bounded-retry executor for `SerializationError` (spec.md §4.1), grounded
//! on the exponential-backoff `RetryExecutor` in the teacher's sidecar
//! crate (now `orchestry-proxy`), reproduced here independently so the
//! store has no dependency on the proxy.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    /// N=3 per spec.md §4.1.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 20,
            multiplier: 2.0,
        }
    }
}

pub async fn with_retry<F, Fut, T>(config: RetryConfig, mut f: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay_ms = config.initial_delay_ms;
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                debug!(attempt, %err, "retrying store operation");
                sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms as f64 * config.multiplier) as u64;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
