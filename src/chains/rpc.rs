use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::WalletError;

/// Build the shared HTTP client; the timeout bounds every upstream call
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, WalletError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WalletError::ProviderUnavailable(format!("HTTP client: {}", e)))
}

/// Minimal JSON-RPC 2.0 client over reqwest for TON Center
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl JsonRpcClient {
    pub fn new(http: reqwest::Client, url: String, api_key: Option<String>) -> Self {
        Self { http, url, api_key }
    }

    /// Call `method` and deserialize its `result`
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, WalletError> {
        debug!("JSON-RPC {} -> {}", method, self.url);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            return Err(WalletError::Upstream(format!(
                "{} returned HTTP {}: {}",
                method,
                status,
                rpc_error_message(&payload).unwrap_or_default()
            )));
        }

        extract_result(method, payload)
    }
}

/// Pull `result` out of a JSON-RPC envelope, turning `error` into `Upstream`
pub(crate) fn extract_result<T: DeserializeOwned>(method: &str, payload: Value) -> Result<T, WalletError> {
    if let Some(message) = rpc_error_message(&payload) {
        return Err(WalletError::Upstream(format!("{} failed: {}", method, message)));
    }

    let result = payload
        .get("result")
        .cloned()
        .ok_or_else(|| WalletError::Upstream(format!("{} returned no result", method)))?;

    serde_json::from_value(result)
        .map_err(|e| WalletError::Upstream(format!("{} returned unexpected data: {}", method, e)))
}

/// Error message of a JSON-RPC envelope. Handles both the standard
/// `{"error": {"code", "message"}}` shape and TON Center's `{"ok": false, "error": "..."}`.
fn rpc_error_message(payload: &Value) -> Option<String> {
    match payload.get("error") {
        Some(Value::Null) | None => {}
        Some(Value::String(message)) => return Some(message.clone()),
        Some(error) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Some(message);
        }
    }

    if payload.get("ok") == Some(&Value::Bool(false)) {
        return Some("request rejected".to_string());
    }

    None
}
