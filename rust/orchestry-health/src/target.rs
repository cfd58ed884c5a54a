use orchestry_types::HealthCheckConfig;

/// Everything the prober needs to probe one replica, independent of how the
/// caller discovered it (the Replica Manager owns discovery).
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub instance_id: String,
    pub app_name: String,
    pub replica_index: u32,
    pub url: String,
    pub config: HealthCheckConfig,
}
