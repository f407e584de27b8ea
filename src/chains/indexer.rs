use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::types::{lenient_opt_u64, lenient_string, NftItem, RawTokenBalance};
use crate::errors::WalletError;

const EVM_API_BASE: &str = "https://deep-index.moralis.io/api/v2.2";
const SOLANA_API_BASE: &str = "https://solana-gateway.moralis.io";

/// ERC-20 precision assumed when the indexer omits `decimals`
const DEFAULT_ERC20_DECIMALS: u32 = 18;
/// SPL precision assumed when the indexer omits `decimals`, same as SOL
const DEFAULT_SPL_DECIMALS: u32 = 9;

/// Client for the unified multi-chain indexing API (Moralis).
///
/// EVM endpoints are keyed by a hex chain id (`0x1`, `0x38`, `0x89`),
/// Solana endpoints by a network string (`mainnet`). Every call needs an API
/// key; without one the client reports `ProviderUnavailable`.
#[derive(Debug, Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvmTokenRecord {
    token_address: String,
    #[serde(deserialize_with = "lenient_string", default)]
    name: String,
    #[serde(deserialize_with = "lenient_string", default)]
    symbol: String,
    #[serde(deserialize_with = "lenient_opt_u64", default)]
    decimals: Option<u64>,
    balance: String,
}

#[derive(Debug, Deserialize)]
struct EvmNftPage {
    #[serde(default)]
    result: Vec<EvmNftRecord>,
}

#[derive(Debug, Deserialize)]
struct EvmNftRecord {
    token_address: String,
    #[serde(default)]
    token_id: Option<String>,
    #[serde(deserialize_with = "lenient_string", default)]
    name: String,
    #[serde(deserialize_with = "lenient_string", default)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplTokenRecord {
    mint: String,
    #[serde(deserialize_with = "lenient_string", default)]
    name: String,
    #[serde(deserialize_with = "lenient_string", default)]
    symbol: String,
    amount_raw: String,
    #[serde(deserialize_with = "lenient_opt_u64", default)]
    decimals: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SplNftRecord {
    mint: String,
    #[serde(deserialize_with = "lenient_string", default)]
    name: String,
    #[serde(deserialize_with = "lenient_string", default)]
    symbol: String,
}

impl IndexerClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// ERC-20 balances of `address` on `chain`
    pub async fn evm_tokens(&self, address: &str, chain: &str) -> Result<Vec<RawTokenBalance>, WalletError> {
        let url = format!("{}/{}/erc20", EVM_API_BASE, address);
        let records: Vec<EvmTokenRecord> = self.get(&url, &[("chain", chain)]).await?;
        records.into_iter().map(map_evm_token).collect()
    }

    /// NFTs held by `address` on `chain`
    pub async fn evm_nfts(&self, address: &str, chain: &str, network: &str) -> Result<Vec<NftItem>, WalletError> {
        let url = format!("{}/{}/nft", EVM_API_BASE, address);
        let page: EvmNftPage = self
            .get(&url, &[("chain", chain), ("format", "decimal")])
            .await?;
        Ok(page
            .result
            .into_iter()
            .map(|nft| map_evm_nft(nft, network))
            .collect())
    }

    /// SPL token balances of `address`
    pub async fn solana_tokens(&self, address: &str, cluster: &str) -> Result<Vec<RawTokenBalance>, WalletError> {
        let url = format!("{}/account/{}/{}/tokens", SOLANA_API_BASE, cluster, address);
        let records: Vec<SplTokenRecord> = self.get(&url, &[]).await?;
        records.into_iter().map(map_spl_token).collect()
    }

    /// Metaplex NFTs owned by `address`
    pub async fn solana_nfts(&self, address: &str, cluster: &str, network: &str) -> Result<Vec<NftItem>, WalletError> {
        let url = format!("{}/account/{}/{}/nft", SOLANA_API_BASE, cluster, address);
        let records: Vec<SplNftRecord> = self.get(&url, &[]).await?;
        Ok(records
            .into_iter()
            .map(|nft| NftItem::solana(nft.mint, nft.name, nft.symbol, network))
            .collect())
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, WalletError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            WalletError::ProviderUnavailable(
                "MORALIS_API_KEY is not set, token and NFT lookups are disabled".to_string(),
            )
        })?;

        debug!("Indexer GET {}", url);
        let response = self
            .http
            .get(url)
            .query(query)
            .header("X-API-Key", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(WalletError::ProviderUnavailable(format!(
                "indexer rejected the API key (HTTP {})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::Upstream(format!(
                "indexer returned HTTP {}: {}",
                status, body
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

fn token_decimals(decimals: Option<u64>, default: u32, token: &str) -> Result<u32, WalletError> {
    match decimals {
        None => Ok(default),
        Some(value) => u32::try_from(value).map_err(|_| {
            WalletError::Upstream(format!("token {} reports {} decimals", token, value))
        }),
    }
}

fn map_evm_token(record: EvmTokenRecord) -> Result<RawTokenBalance, WalletError> {
    let decimals = token_decimals(record.decimals, DEFAULT_ERC20_DECIMALS, &record.token_address)?;
    Ok(RawTokenBalance {
        contract: record.token_address.to_lowercase(),
        name: record.name,
        symbol: record.symbol,
        amount_raw: record.balance,
        decimals,
    })
}

fn map_evm_nft(record: EvmNftRecord, network: &str) -> NftItem {
    NftItem::evm(
        record.token_address.to_lowercase(),
        record.token_id,
        record.name,
        record.symbol,
        network,
    )
}

fn map_spl_token(record: SplTokenRecord) -> Result<RawTokenBalance, WalletError> {
    let decimals = token_decimals(record.decimals, DEFAULT_SPL_DECIMALS, &record.mint)?;
    Ok(RawTokenBalance {
        contract: record.mint,
        name: record.name,
        symbol: record.symbol,
        amount_raw: record.amount_raw,
        decimals,
    })
}
