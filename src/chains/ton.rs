use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::json;

use super::network::NetworkConfig;
use super::rpc::JsonRpcClient;
use super::types::{lenient_string, lenient_u64, NftItem, RawTokenBalance, RawTransaction, TransactionStatus};
use super::ChainProvider;
use crate::errors::WalletError;

/// TON mainnet through the TON Center v2 JSON-RPC endpoint
pub struct TonProvider {
    network: NetworkConfig,
    rpc: JsonRpcClient,
}

#[derive(Debug, Deserialize)]
struct TonTransaction {
    #[serde(deserialize_with = "lenient_u64", default)]
    utime: u64,
    transaction_id: TonTransactionId,
    #[serde(default)]
    in_msg: Option<TonMessage>,
    #[serde(default)]
    out_msgs: Vec<TonMessage>,
}

#[derive(Debug, Deserialize)]
struct TonTransactionId {
    hash: String,
}

#[derive(Debug, Default, Deserialize)]
struct TonMessage {
    #[serde(deserialize_with = "lenient_string", default)]
    source: String,
    #[serde(deserialize_with = "lenient_string", default)]
    destination: String,
    #[serde(deserialize_with = "lenient_string", default)]
    value: String,
}

impl TonProvider {
    pub fn new(network: NetworkConfig, http: reqwest::Client) -> Self {
        let rpc = JsonRpcClient::new(
            http,
            network.primary_rpc().to_string(),
            network.rpc_api_key.clone(),
        );
        Self { network, rpc }
    }
}

#[async_trait]
impl ChainProvider for TonProvider {
    fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn native_balance(&self, address: &str) -> Result<String, WalletError> {
        let address = self.normalize_address(address)?;
        let balance: String = self
            .rpc
            .call("getAddressBalance", json!({ "address": address }))
            .await?;
        debug!("Balance of {}: {} nanoton", address, balance);
        Ok(balance)
    }

    async fn transactions(&self, address: &str, limit: usize) -> Result<Vec<RawTransaction>, WalletError> {
        let address = self.normalize_address(address)?;
        let records: Vec<TonTransaction> = self
            .rpc
            .call("getTransactions", json!({ "address": address, "limit": limit }))
            .await?;

        Ok(records
            .into_iter()
            .take(limit)
            .map(|tx| map_transaction(tx, &address))
            .collect())
    }

    async fn token_balances(&self, address: &str) -> Result<Vec<RawTokenBalance>, WalletError> {
        self.normalize_address(address)?;
        Err(WalletError::ProviderUnavailable(
            "jetton balances are not available on TON".to_string(),
        ))
    }

    async fn nfts(&self, address: &str) -> Result<Vec<NftItem>, WalletError> {
        self.normalize_address(address)?;
        Err(WalletError::ProviderUnavailable(
            "NFT lookups are not available on TON".to_string(),
        ))
    }
}

fn map_transaction(tx: TonTransaction, address: &str) -> RawTransaction {
    let incoming = tx.in_msg.unwrap_or_default();

    // External in-message with an outgoing transfer: the wallet is the sender
    let (from, to, value) = match tx.out_msgs.into_iter().next() {
        Some(out) if incoming.source.is_empty() => (address.to_string(), out.destination, out.value),
        _ => (incoming.source, incoming.destination, incoming.value),
    };

    RawTransaction {
        hash: tx.transaction_id.hash,
        from,
        to,
        value_raw: if value.is_empty() { "0".to_string() } else { value },
        timestamp: tx.utime,
        status: TransactionStatus::Success,
    }
}
