use std::time::Duration;

/// Timing knobs for the election state machine (spec.md §4.2 defaults).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub node_id: String,
    pub hostname: String,
    pub advertise_url: String,
    pub lease_ttl: Duration,
    pub heartbeat_interval: Duration,
    pub election_check_interval: Duration,
    pub stale_node_prune_after: Duration,
}

impl CoordinatorConfig {
    pub fn new(node_id: impl Into<String>, hostname: impl Into<String>, advertise_url: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            hostname: hostname.into(),
            advertise_url: advertise_url.into(),
            lease_ttl: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            election_check_interval: Duration::from_secs(5),
            stale_node_prune_after: Duration::from_secs(5 * 60),
        }
    }

    /// heartbeat interval × 3 ≤ TTL, per spec.md §4.2.
    pub fn is_valid(&self) -> bool {
        self.heartbeat_interval.saturating_mul(3) <= self.lease_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings_satisfy_the_heartbeat_invariant() {
        let cfg = CoordinatorConfig::new("n1", "host1", "http://host1:9000");
        assert!(cfg.is_valid());
    }

    #[test]
    fn invalid_when_heartbeat_too_close_to_ttl() {
        let mut cfg = CoordinatorConfig::new("n1", "host1", "http://host1:9000");
        cfg.heartbeat_interval = Duration::from_secs(11);
        assert!(!cfg.is_valid());
    }
}
