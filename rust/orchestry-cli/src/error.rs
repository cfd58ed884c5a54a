//! Error type for the CLI binary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("server returned {status}: {body}")]
    Server { status: reqwest::StatusCode, body: String },

    #[error("store error: {0}")]
    Store(#[from] orchestry_store::StoreError),
}

pub type Result<T> = std::result::Result<T, CliError>;
