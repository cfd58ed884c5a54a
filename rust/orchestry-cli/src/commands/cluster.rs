//! `orchestry cluster` subcommands.

use serde_json::Value;

use crate::client::ApiClient;
use crate::error::Result;

pub async fn status(client: &ApiClient) -> Result<Value> {
    client.get("/cluster/status").await
}

pub async fn leader(client: &ApiClient) -> Result<Value> {
    client.get("/cluster/leader").await
}

pub async fn health(client: &ApiClient) -> Result<Value> {
    client.get("/cluster/health").await
}
