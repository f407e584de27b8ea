use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Wallet on the watchlist, stored as JSON under its address in the `watchlist` hash
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WatchedWallet {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Unix seconds
    pub added_at: i64,
}

impl WatchedWallet {
    pub fn new(address: String, label: Option<String>) -> Self {
        Self {
            address,
            label,
            added_at: Utc::now().timestamp(),
        }
    }
}
