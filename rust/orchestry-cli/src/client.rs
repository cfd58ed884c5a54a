//! Thin wrapper over `reqwest` for talking to a running `orchestryd`'s
//! admin HTTP API (spec.md §6). Mirrors the non-2xx-is-an-error handling
//! the admin API itself uses, just inverted: the body's `"error"` field on
//! a failed response is surfaced directly to the operator.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CliError, Result};

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), http: reqwest::Client::new() }
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|source| CliError::Request { url: url.clone(), source })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| CliError::Request { url, source })?;

        if status == StatusCode::NO_CONTENT || text.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        if !status.is_success() {
            return Err(CliError::Server { status, body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<Value> {
        self.send(Method::POST, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash_from_base_url() {
        let client = ApiClient::new("http://localhost:8080/".to_string());
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn new_leaves_a_slash_free_base_url_unchanged() {
        let client = ApiClient::new("http://localhost:8080".to_string());
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
