//! CPU/memory spec-string parsing (spec.md §4.5 "Resource translation").

use crate::error::{ReplicaError, Result};

/// `"0.5"` or `"500m"` -> nano-CPUs (runtime's quota unit, 1 CPU = 1e9).
pub fn parse_cpu_nanos(spec: &str) -> Result<i64> {
    let spec = spec.trim();
    if let Some(millis) = spec.strip_suffix('m') {
        let millis: f64 = millis
            .parse()
            .map_err(|_| ReplicaError::InvalidSpec(format!("invalid millicpu value {spec:?}")))?;
        return Ok((millis * 1_000_000.0) as i64);
    }
    let cores: f64 = spec
        .parse()
        .map_err(|_| ReplicaError::InvalidSpec(format!("invalid cpu value {spec:?}")))?;
    Ok((cores * 1_000_000_000.0) as i64)
}

/// `"256Mi"` -> bytes (binary megabytes, matching the original's Mi suffix).
pub fn parse_memory_bytes(spec: &str) -> Result<i64> {
    let spec = spec.trim();
    let mi = spec
        .strip_suffix("Mi")
        .ok_or_else(|| ReplicaError::InvalidSpec(format!("memory spec must use an Mi suffix, got {spec:?}")))?;
    let mi: f64 = mi
        .parse()
        .map_err(|_| ReplicaError::InvalidSpec(format!("invalid memory value {spec:?}")))?;
    Ok((mi * 1024.0 * 1024.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_cpu() {
        assert_eq!(parse_cpu_nanos("0.5").unwrap(), 500_000_000);
        assert_eq!(parse_cpu_nanos("2").unwrap(), 2_000_000_000);
    }

    #[test]
    fn parses_millicpu_suffix() {
        assert_eq!(parse_cpu_nanos("500m").unwrap(), 500_000_000);
        assert_eq!(parse_cpu_nanos("100m").unwrap(), 100_000_000);
    }

    #[test]
    fn rejects_malformed_cpu() {
        assert!(parse_cpu_nanos("abc").is_err());
    }

    #[test]
    fn parses_binary_megabytes() {
        assert_eq!(parse_memory_bytes("256Mi").unwrap(), 256 * 1024 * 1024);
    }

    #[test]
    fn rejects_memory_without_mi_suffix() {
        assert!(parse_memory_bytes("256").is_err());
        assert!(parse_memory_bytes("256MB").is_err());
    }
}
