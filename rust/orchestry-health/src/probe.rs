//! A single HTTP probe against one replica (spec.md §4.3). Grounded on
//! `other_examples`'s `probe_endpoint` (reqwest + `tokio::time::timeout`,
//! status/latency/error result shape).

use std::time::{Duration, Instant};

use reqwest::Client;

/// Outcome of one probe attempt.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub healthy: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// A replica is healthy iff the response status is in [200, 400).
fn status_is_healthy(status: u16) -> bool {
    (200..400).contains(&status)
}

pub async fn probe_once(client: &Client, url: &str, timeout: Duration) -> ProbeResult {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, client.get(url).send()).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(response)) => {
            let status = response.status().as_u16();
            let healthy = status_is_healthy(status);
            ProbeResult {
                healthy,
                status_code: Some(status),
                latency_ms,
                error: if healthy { None } else { Some(format!("HTTP {status}")) },
            }
        }
        Ok(Err(err)) => ProbeResult {
            healthy: false,
            status_code: None,
            latency_ms,
            error: Some(err.to_string()),
        },
        Err(_) => ProbeResult {
            healthy: false,
            status_code: None,
            latency_ms: timeout.as_millis() as u64,
            error: Some("probe timed out".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_hundred_is_healthy() {
        assert!(status_is_healthy(200));
        assert!(status_is_healthy(204));
        assert!(status_is_healthy(399));
    }

    #[test]
    fn four_hundred_and_above_is_unhealthy() {
        assert!(!status_is_healthy(400));
        assert!(!status_is_healthy(500));
    }

    #[test]
    fn below_two_hundred_is_unhealthy() {
        assert!(!status_is_healthy(101));
    }
}
