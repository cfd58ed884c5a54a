//! The in-memory live replica index (spec.md §4.5). A single `tokio::sync::Mutex`
//! guards the whole index rather than one lock per app, per the spec's
//! explicit "not per-app, for simplicity" concurrency rule.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use orchestry_types::ContainerInstance;
use tokio::sync::{Mutex, MutexGuard};

use crate::labels::next_free_index;

#[derive(Default)]
pub struct ReplicaIndex {
    inner: Mutex<HashMap<String, BTreeMap<u32, ContainerInstance>>>,
}

impl ReplicaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, HashMap<String, BTreeMap<u32, ContainerInstance>>> {
        self.inner.lock().await
    }

    pub async fn get(&self, app: &str) -> Vec<ContainerInstance> {
        self.lock().await.get(app).map(|m| m.values().cloned().collect()).unwrap_or_default()
    }

    pub async fn insert(&self, app: &str, instance: ContainerInstance) {
        self.lock()
            .await
            .entry(app.to_string())
            .or_default()
            .insert(instance.replica_index, instance);
    }

    pub async fn remove(&self, app: &str, index: u32) -> Option<ContainerInstance> {
        self.lock().await.get_mut(app).and_then(|m| m.remove(&index))
    }

    pub async fn clear_app(&self, app: &str) {
        self.lock().await.remove(app);
    }

    pub async fn next_free_index(&self, app: &str) -> u32 {
        let guard = self.lock().await;
        let used: BTreeSet<u32> = guard.get(app).map(|m| m.keys().copied().collect()).unwrap_or_default();
        next_free_index(&used)
    }

    pub async fn is_known_app(&self, app: &str) -> bool {
        self.lock().await.contains_key(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orchestry_types::ReplicaState;

    fn instance(app: &str, index: u32) -> ContainerInstance {
        ContainerInstance {
            id: format!("{app}-{index}"),
            app_name: app.to_string(),
            replica_index: index,
            container_id: format!("cid-{app}-{index}"),
            state: ReplicaState::Starting,
            host_port: None,
            container_port: 8080,
            consecutive_health_failures: 0,
            consecutive_health_successes: 0,
            last_health_check_at: None,
            cpu_percent: None,
            memory_percent: None,
            restart_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn next_free_index_accounts_for_existing_entries() {
        let index = ReplicaIndex::new();
        index.insert("demo", instance("demo", 0)).await;
        index.insert("demo", instance("demo", 1)).await;
        assert_eq!(index.next_free_index("demo").await, 2);
    }

    #[tokio::test]
    async fn next_free_index_is_independent_per_app() {
        let index = ReplicaIndex::new();
        index.insert("a", instance("a", 0)).await;
        assert_eq!(index.next_free_index("b").await, 0);
    }

    #[tokio::test]
    async fn remove_drops_only_the_targeted_replica() {
        let index = ReplicaIndex::new();
        index.insert("demo", instance("demo", 0)).await;
        index.insert("demo", instance("demo", 1)).await;
        index.remove("demo", 0).await;
        let remaining = index.get("demo").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].replica_index, 1);
    }
}
