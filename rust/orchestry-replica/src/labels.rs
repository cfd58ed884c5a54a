//! Label-based container adoption (spec.md §4.5 `reconcileApp`).

use std::collections::HashMap;

pub const APP_LABEL: &str = "orchestry.app";
pub const REPLICA_INDEX_LABEL: &str = "orchestry.replica_index";

pub fn container_name(app: &str, index: u32) -> String {
    format!("{app}-{index}")
}

pub fn labels_for(app: &str, index: u32) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert(APP_LABEL.to_string(), app.to_string());
    labels.insert(REPLICA_INDEX_LABEL.to_string(), index.to_string());
    labels
}

/// Prefer the label; fall back to parsing the `<app>-<index>` name suffix
/// for containers adopted from an engine that didn't preserve labels.
pub fn replica_index_of(app: &str, name: &str, labels: &HashMap<String, String>) -> Option<u32> {
    if let Some(raw) = labels.get(REPLICA_INDEX_LABEL) {
        if let Ok(index) = raw.parse() {
            return Some(index);
        }
    }
    name.strip_prefix(&format!("{app}-")).and_then(|suffix| suffix.parse().ok())
}

/// Smallest non-negative integer not in `used`.
pub fn next_free_index(used: &std::collections::BTreeSet<u32>) -> u32 {
    let mut candidate = 0;
    for &index in used {
        if index != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_free_index_fills_gaps() {
        let used: std::collections::BTreeSet<u32> = [0, 1, 3].into_iter().collect();
        assert_eq!(next_free_index(&used), 2);
    }

    #[test]
    fn next_free_index_is_zero_when_empty() {
        assert_eq!(next_free_index(&Default::default()), 0);
    }

    #[test]
    fn next_free_index_appends_when_dense() {
        let used: std::collections::BTreeSet<u32> = [0, 1, 2].into_iter().collect();
        assert_eq!(next_free_index(&used), 3);
    }

    #[test]
    fn replica_index_prefers_label_over_name_suffix() {
        let mut labels = HashMap::new();
        labels.insert(REPLICA_INDEX_LABEL.to_string(), "5".to_string());
        assert_eq!(replica_index_of("demo", "demo-9", &labels), Some(5));
    }

    #[test]
    fn replica_index_falls_back_to_name_suffix() {
        assert_eq!(replica_index_of("demo", "demo-2", &HashMap::new()), Some(2));
    }
}
