use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Recorded balance change of a watched wallet; immutable once written
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAlert {
    pub address: String,
    pub network: String,
    pub previous_balance: String,
    pub current_balance: String,
    pub symbol: String,
    /// Unix milliseconds
    pub detected_at: i64,
}

impl BalanceAlert {
    pub fn new(
        address: String,
        network: String,
        previous_balance: String,
        current_balance: String,
        symbol: String,
    ) -> Self {
        Self {
            address,
            network,
            previous_balance,
            current_balance,
            symbol,
            detected_at: Utc::now().timestamp_millis(),
        }
    }
}
