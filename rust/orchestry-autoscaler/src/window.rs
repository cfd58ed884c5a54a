//! Rolling per-app, per-metric sample windows (spec.md §4.6).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use orchestry_types::{MetricSample, WindowAggregate};

/// How many multiples of `windowSeconds` of raw points to retain before
/// eviction, mirroring the original controller's `METRICS_RETENTION_MULTIPLIER`.
pub const METRICS_RETENTION_MULTIPLIER: u32 = 2;

#[derive(Debug, Default)]
pub struct MetricWindow {
    points: VecDeque<(DateTime<Utc>, MetricSample)>,
}

impl MetricWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and evict points older than `2 * window_seconds`.
    pub fn push(&mut self, sample: MetricSample, window_seconds: u32) {
        self.points.push_back((sample.timestamp, sample));
        let retention = chrono::Duration::seconds((window_seconds * METRICS_RETENTION_MULTIPLIER) as i64);
        let cutoff = sample.timestamp - retention;
        while let Some((ts, _)) = self.points.front() {
            if *ts < cutoff {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    /// Aggregate the points within `now - window_seconds .. now`. `None` if
    /// no points fall in the window.
    pub fn aggregate(&self, now: DateTime<Utc>, window_seconds: u32) -> Option<WindowAggregate> {
        let cutoff = now - chrono::Duration::seconds(window_seconds as i64);
        let recent: Vec<&MetricSample> = self
            .points
            .iter()
            .filter(|(ts, _)| *ts >= cutoff)
            .map(|(_, sample)| sample)
            .collect();

        if recent.is_empty() {
            return None;
        }

        let n = recent.len() as f64;
        let mean_rps = recent.iter().map(|s| s.requests_per_second).sum::<f64>() / n;
        let mean_connections = recent.iter().map(|s| s.active_connections as f64).sum::<f64>() / n;
        let mean_cpu_percent = recent.iter().map(|s| s.cpu_percent).sum::<f64>() / n;
        let mean_memory_percent = recent.iter().map(|s| s.memory_percent).sum::<f64>() / n;

        let mut latencies: Vec<f64> = recent.iter().map(|s| s.p95_latency_ms).collect();
        let p95_latency_ms = percentile_95(&mut latencies);

        Some(WindowAggregate {
            mean_rps,
            p95_latency_ms,
            mean_connections,
            mean_cpu_percent,
            mean_memory_percent,
            sample_count: recent.len(),
        })
    }
}

/// 95th-percentile via the same 20-partition "exclusive" equal-bucket
/// quantile method as the original's `statistics.quantiles(data, n=20)`
/// (the 95th percentile is bucket 18 of the 19 cut points); with fewer
/// than 2 samples, the max (spec.md §4.6 step 6).
fn percentile_95(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.len() < 2 {
        return values[0];
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    equal_bucket_quantile(values, 19, 20)
}

/// The `i`-th of `n` equal-bucket quantile cut points, `data` sorted
/// ascending, `1 <= i <= n - 1`. Transcribed from CPython's
/// `statistics.quantiles(data, n, method='exclusive')`.
fn equal_bucket_quantile(data: &[f64], i: i64, n: i64) -> f64 {
    let ld = data.len() as i64;
    let m = ld + 1;
    let scaled = i * m;
    let j = (scaled / n).clamp(1, ld - 1);
    let delta = scaled - j * n;
    let n_f = n as f64;
    (data[(j - 1) as usize] * (n_f - delta as f64) + data[j as usize] * delta as f64) / n_f
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: DateTime<Utc>, rps: f64, latency: f64) -> MetricSample {
        MetricSample {
            timestamp: ts,
            requests_per_second: rps,
            p95_latency_ms: latency,
            active_connections: 10,
            cpu_percent: 50.0,
            memory_percent: 40.0,
        }
    }

    #[test]
    fn aggregate_is_none_with_no_points_in_window() {
        let window = MetricWindow::new();
        assert!(window.aggregate(Utc::now(), 20).is_none());
    }

    #[test]
    fn aggregate_computes_arithmetic_means() {
        let mut window = MetricWindow::new();
        let now = Utc::now();
        window.push(sample(now, 10.0, 100.0), 20);
        window.push(sample(now, 20.0, 200.0), 20);
        let agg = window.aggregate(now, 20).unwrap();
        assert_eq!(agg.mean_rps, 15.0);
        assert_eq!(agg.sample_count, 2);
    }

    #[test]
    fn percentile_with_single_sample_is_the_sample_itself() {
        let mut values = vec![42.0];
        assert_eq!(percentile_95(&mut values), 42.0);
    }

    #[test]
    fn percentile_95_matches_cpython_exclusive_quantiles_for_1_through_20() {
        let mut values: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        // statistics.quantiles([1..20], n=20)[18] == 19.95
        assert_eq!(percentile_95(&mut values), 19.95);
    }

    #[test]
    fn eviction_drops_points_older_than_retention() {
        let mut window = MetricWindow::new();
        let now = Utc::now();
        let old = now - chrono::Duration::seconds(100);
        window.push(sample(old, 1.0, 1.0), 20);
        window.push(sample(now, 2.0, 2.0), 20);
        // retention = 2*20 = 40s, old point at -100s should be evicted
        assert_eq!(window.points.len(), 1);
    }
}
