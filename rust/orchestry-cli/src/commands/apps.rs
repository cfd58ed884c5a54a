//! `orchestry apps`/top-level app commands: thin calls onto the admin API.

use std::path::Path;

use serde_json::Value;

use crate::client::ApiClient;
use crate::error::Result;

pub async fn register(client: &ApiClient, spec_path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(spec_path)?;
    let body: Value = serde_json::from_str(&raw)?;
    client.post("/apps/register", body).await
}

pub async fn up(client: &ApiClient, name: &str) -> Result<Value> {
    client.post_empty(&format!("/apps/{name}/up")).await
}

pub async fn down(client: &ApiClient, name: &str) -> Result<Value> {
    client.post_empty(&format!("/apps/{name}/down")).await
}

pub async fn status(client: &ApiClient, name: &str) -> Result<Value> {
    client.get(&format!("/apps/{name}/status")).await
}

pub async fn scale(client: &ApiClient, name: &str, replicas: u32) -> Result<Value> {
    client.post(&format!("/apps/{name}/scale"), serde_json::json!({ "replicas": replicas })).await
}

pub async fn set_policy(client: &ApiClient, name: &str, policy_path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(policy_path)?;
    let policy: Value = serde_json::from_str(&raw)?;
    client.post(&format!("/apps/{name}/policy"), serde_json::json!({ "policy": policy })).await
}

pub async fn list(client: &ApiClient) -> Result<Value> {
    client.get("/apps").await
}

pub async fn raw(client: &ApiClient, name: &str) -> Result<Value> {
    client.get(&format!("/apps/{name}/raw")).await
}

pub async fn metrics(client: &ApiClient, name: &str) -> Result<Value> {
    client.get(&format!("/apps/{name}/metrics")).await
}

pub async fn simulate_metrics(client: &ApiClient, name: &str, metrics_path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(metrics_path)?;
    let body: Value = serde_json::from_str(&raw)?;
    client.post(&format!("/apps/{name}/simulateMetrics"), body).await
}

pub async fn global_metrics(client: &ApiClient) -> Result<Value> {
    client.get("/metrics").await
}

pub async fn events(client: &ApiClient, app: Option<&str>, kind: Option<&str>, limit: u32) -> Result<Value> {
    client.get(&events_path(app, kind, limit)).await
}

fn events_path(app: Option<&str>, kind: Option<&str>, limit: u32) -> String {
    let mut path = format!("/events?limit={limit}");
    if let Some(app) = app {
        path.push_str(&format!("&app={app}"));
    }
    if let Some(kind) = kind {
        path.push_str(&format!("&kind={kind}"));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_path_with_no_filters_is_limit_only() {
        assert_eq!(events_path(None, None, 50), "/events?limit=50");
    }

    #[test]
    fn events_path_appends_app_and_kind_filters() {
        assert_eq!(events_path(Some("web"), Some("scaling"), 25), "/events?limit=25&app=web&kind=scaling");
    }
}
