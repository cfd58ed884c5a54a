//! `ORCHESTRY_`/`CLUSTER_`/`POSTGRES_`-prefixed environment loading
//! (spec.md §6), following the `KNHK_`-prefixed env scan in the teacher's
//! own config crate, simplified to explicit typed fields since the core
//! owns no on-disk config file format.

use std::env;

use crate::error::{ConfigError, Result};

pub fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

pub fn optional(key: &str, default: impl Into<String>) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

pub fn optional_u16(key: &str, default: u16) -> Result<u16> {
    match env::var(key) {
        Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: v,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_falls_back_to_default() {
        env::remove_var("ORCHESTRY_TEST_UNSET_KEY");
        assert_eq!(optional("ORCHESTRY_TEST_UNSET_KEY", "fallback"), "fallback");
    }

    #[test]
    fn required_errors_when_missing() {
        env::remove_var("ORCHESTRY_TEST_MISSING_KEY");
        assert!(required("ORCHESTRY_TEST_MISSING_KEY").is_err());
    }
}
