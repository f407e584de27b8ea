use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::Http;
use alloy::transports::layers::FallbackLayer;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::str::FromStr;
use tower::ServiceBuilder;

use super::indexer::IndexerClient;
use super::network::NetworkConfig;
use super::types::{lenient_u64, NftItem, RawTokenBalance, RawTransaction, TransactionStatus};
use super::ChainProvider;
use crate::errors::WalletError;

/// EVM-compatible chains (Ethereum, BNB Chain, Polygon).
///
/// Balances come from JSON-RPC, transaction history from the chain's block
/// explorer, tokens and NFTs from the indexer.
pub struct EvmProvider {
    network: NetworkConfig,
    provider: DynProvider,
    http: reqwest::Client,
    indexer: IndexerClient,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplorerTransaction {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
    #[serde(deserialize_with = "lenient_u64")]
    time_stamp: u64,
    #[serde(default)]
    is_error: String,
    #[serde(default, rename = "txreceipt_status")]
    receipt_status: String,
}

/// Create an alloy provider that falls back across every configured RPC
pub fn create_provider(rpcs: &[String]) -> Result<DynProvider> {
    let rpc_len = NonZeroUsize::new(rpcs.len()).ok_or_else(|| anyhow!("No RPC URL configured"))?;
    let fallback_layer = FallbackLayer::default().with_active_transport_count(rpc_len);

    let transports = rpcs
        .iter()
        .map(|url| {
            url.parse::<Url>()
                .map(Http::new)
                .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", url, e))
        })
        .collect::<Result<Vec<_>>>()?;

    // Apply the FallbackLayer to the transports
    let transport = ServiceBuilder::new()
        .layer(fallback_layer)
        .service(transports);
    let client = RpcClient::builder().transport(transport, false);
    let provider = ProviderBuilder::new().connect_client(client);
    Ok(provider.erased())
}

impl EvmProvider {
    pub fn new(network: NetworkConfig, http: reqwest::Client, indexer: IndexerClient) -> Result<Self> {
        let provider = create_provider(&network.rpc_urls)?;
        Ok(Self {
            network,
            provider,
            http,
            indexer,
        })
    }

    fn indexer_chain(&self) -> Result<&str, WalletError> {
        self.network.indexer_chain.as_deref().ok_or_else(|| {
            WalletError::ProviderUnavailable(format!("no indexer chain id for {}", self.network.name))
        })
    }
}

#[async_trait]
impl ChainProvider for EvmProvider {
    fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn native_balance(&self, address: &str) -> Result<String, WalletError> {
        let address = self.normalize_address(address)?;
        let parsed = Address::from_str(&address)
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?;

        let balance = tokio::time::timeout(
            self.network.request_timeout,
            self.provider.get_balance(parsed),
        )
        .await
        .map_err(|_| WalletError::UpstreamTimeout(format!("eth_getBalance for {}", address)))?
        .map_err(|e| WalletError::Upstream(format!("eth_getBalance failed: {}", e)))?;

        debug!("Balance of {} on {}: {} wei", address, self.network.name, balance);
        Ok(balance.to_string())
    }

    async fn transactions(&self, address: &str, limit: usize) -> Result<Vec<RawTransaction>, WalletError> {
        let address = self.normalize_address(address)?;

        let explorer_url = self.network.explorer_api_url.as_deref().ok_or_else(|| {
            WalletError::ProviderUnavailable(format!("no explorer API for {}", self.network.name))
        })?;
        let api_key = self.network.explorer_api_key.as_deref().ok_or_else(|| {
            WalletError::ProviderUnavailable(format!(
                "explorer API key for {} is not set, transaction history is disabled",
                self.network.name
            ))
        })?;

        let offset = limit.to_string();
        let response = self
            .http
            .get(explorer_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("sort", "desc"),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("apikey", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WalletError::Upstream(format!(
                "explorer returned HTTP {}",
                response.status()
            )));
        }

        let body: ExplorerResponse = response.json().await?;
        let mut transactions = parse_explorer_response(body)?;
        transactions.truncate(limit);
        Ok(transactions)
    }

    async fn token_balances(&self, address: &str) -> Result<Vec<RawTokenBalance>, WalletError> {
        let address = self.normalize_address(address)?;
        self.indexer.evm_tokens(&address, self.indexer_chain()?).await
    }

    async fn nfts(&self, address: &str) -> Result<Vec<NftItem>, WalletError> {
        let address = self.normalize_address(address)?;
        self.indexer
            .evm_nfts(&address, self.indexer_chain()?, &self.network.name)
            .await
    }
}

fn parse_explorer_response(body: ExplorerResponse) -> Result<Vec<RawTransaction>, WalletError> {
    if body.status != "1" {
        if body.message.starts_with("No transactions found") {
            return Ok(Vec::new());
        }
        let detail = body.result.as_str().unwrap_or_default();
        return Err(WalletError::Upstream(format!(
            "explorer error: {} {}",
            body.message, detail
        )));
    }

    let records: Vec<ExplorerTransaction> = serde_json::from_value(body.result)
        .map_err(|e| WalletError::Upstream(format!("unexpected explorer payload: {}", e)))?;

    Ok(records.into_iter().map(map_explorer_transaction).collect())
}

fn map_explorer_transaction(tx: ExplorerTransaction) -> RawTransaction {
    let status = if tx.is_error == "1" || tx.receipt_status == "0" {
        TransactionStatus::Failed
    } else {
        TransactionStatus::Success
    };

    RawTransaction {
        hash: tx.hash,
        from: tx.from,
        to: tx.to,
        value_raw: tx.value,
        timestamp: tx.time_stamp,
        status,
    }
}
