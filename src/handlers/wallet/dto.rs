use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<usize>,
}

/// Body of `POST /wallets/watch`
#[derive(Debug, Deserialize)]
pub struct WatchWalletRequest {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WatchWalletResponse {
    pub success: bool,
    pub address: String,
}
