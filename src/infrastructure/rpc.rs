//! Minimal JSON-RPC client for rippled-style nodes.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Unreachable(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{code}: {message}")]
    Node { code: String, message: String },
    #[error("malformed response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// The node answered with an error status carrying `code`.
    pub fn is_node_code(&self, expected: &str) -> bool {
        matches!(self, Self::Node { code, .. } if code == expected)
    }
}

/// Shared HTTP client; clones reuse the same connection pool.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
}

#[derive(Deserialize)]
struct Envelope {
    result: Value,
}

/// Sends `{"method": m, "params": [p]}` and unwraps the `result` object.
#[derive(Clone)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
}

impl JsonRpcClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, RpcError> {
        let body = json!({ "method": method, "params": [params] });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout(e.to_string())
                } else if e.is_connect() {
                    RpcError::Unreachable(e.to_string())
                } else {
                    RpcError::InvalidResponse(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(RpcError::Status(response.status().as_u16()));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout(e.to_string())
            } else {
                RpcError::InvalidResponse(format!("{method}: {e}"))
            }
        })?;
        let result = envelope.result;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let code = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let message = result
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or(&code)
                .to_string();
            return Err(RpcError::Node { code, message });
        }

        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }
}

/// Reads a ledger index that nodes render either as a number or a string.
pub fn ledger_index(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
