//! Per-metric scale-factor computation (spec.md §4.6 step 7).
//!
//! `healthy_replicas` is not tracked as its own windowed metric (see
//! `DESIGN.md`); the caller's `current_replicas` argument stands in for it,
//! clamped to at least 1 for the per-replica divisions, with the emergency
//! sentinel triggered directly off `current_replicas == 0`.

use orchestry_types::{ScaleFactors, ScalingPolicy, WindowAggregate};

/// The sentinel scale factor used when there are no healthy replicas at all.
pub const EMERGENCY_SCALE_FACTOR: f64 = 10.0;

pub fn compute_factors(
    aggregate: &WindowAggregate,
    policy: &ScalingPolicy,
    current_replicas: u32,
) -> ScaleFactors {
    if current_replicas == 0 {
        return ScaleFactors {
            rps_factor: Some(EMERGENCY_SCALE_FACTOR),
            ..Default::default()
        };
    }

    let replicas = current_replicas as f64;

    let rps_factor = (policy.target_rps_per_replica > 0.0)
        .then(|| (aggregate.mean_rps / replicas) / policy.target_rps_per_replica);

    let latency_factor = (policy.max_p95_latency_ms > 0.0 && aggregate.p95_latency_ms > 0.0)
        .then(|| aggregate.p95_latency_ms / policy.max_p95_latency_ms);

    let connections_factor = (policy.max_conn_per_replica > 0.0)
        .then(|| (aggregate.mean_connections / replicas) / policy.max_conn_per_replica);

    let cpu_factor = (policy.max_cpu_percent > 0.0 && aggregate.mean_cpu_percent > 0.0)
        .then(|| aggregate.mean_cpu_percent / policy.max_cpu_percent);

    let memory_factor = (policy.max_memory_percent > 0.0 && aggregate.mean_memory_percent > 0.0)
        .then(|| aggregate.mean_memory_percent / policy.max_memory_percent);

    ScaleFactors { rps_factor, latency_factor, connections_factor, cpu_factor, memory_factor }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ScalingPolicy {
        ScalingPolicy::default()
    }

    fn aggregate() -> WindowAggregate {
        WindowAggregate {
            mean_rps: 100.0,
            p95_latency_ms: 50.0,
            mean_connections: 40.0,
            mean_cpu_percent: 60.0,
            mean_memory_percent: 50.0,
            sample_count: 5,
        }
    }

    #[test]
    fn zero_current_replicas_triggers_emergency_sentinel() {
        let factors = compute_factors(&aggregate(), &policy(), 0);
        assert_eq!(factors.dominant(), Some(EMERGENCY_SCALE_FACTOR));
    }

    #[test]
    fn rps_factor_divides_by_current_replicas() {
        let factors = compute_factors(&aggregate(), &policy(), 2);
        let expected = (100.0 / 2.0) / policy().target_rps_per_replica;
        assert_eq!(factors.rps_factor, Some(expected));
    }

    #[test]
    fn zero_target_skips_the_metric() {
        let mut policy = policy();
        policy.max_p95_latency_ms = 0.0;
        let factors = compute_factors(&aggregate(), &policy, 2);
        assert_eq!(factors.latency_factor, None);
    }

    proptest::proptest! {
        /// Every metric's scale factor is monotonically non-decreasing in
        /// its own windowed aggregate value, holding policy and replica
        /// count fixed — a heavier load can never compute to a *smaller*
        /// factor (spec.md §8).
        #[test]
        fn rps_factor_is_monotonic_in_mean_rps(
            lo in 0.0f64..1000.0,
            delta in 0.0f64..1000.0,
            replicas in 1u32..20,
        ) {
            let hi = lo + delta;
            let policy = policy();
            let mut agg = aggregate();

            agg.mean_rps = lo;
            let low_factor = compute_factors(&agg, &policy, replicas).rps_factor.unwrap();

            agg.mean_rps = hi;
            let high_factor = compute_factors(&agg, &policy, replicas).rps_factor.unwrap();

            proptest::prop_assert!(high_factor >= low_factor - f64::EPSILON);
        }

        #[test]
        fn cpu_factor_is_monotonic_in_mean_cpu_percent(
            lo in 0.1f64..100.0,
            delta in 0.0f64..100.0,
            replicas in 1u32..20,
        ) {
            let hi = lo + delta;
            let policy = policy();
            let mut agg = aggregate();

            agg.mean_cpu_percent = lo;
            let low_factor = compute_factors(&agg, &policy, replicas).cpu_factor.unwrap();

            agg.mean_cpu_percent = hi;
            let high_factor = compute_factors(&agg, &policy, replicas).cpu_factor.unwrap();

            proptest::prop_assert!(high_factor >= low_factor - f64::EPSILON);
        }
    }
}
