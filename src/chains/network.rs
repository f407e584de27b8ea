use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::NetworkSettings;

/// Architectural family of a chain; decides which provider variant serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
    Ton,
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFamily::Evm => write!(f, "evm"),
            ChainFamily::Solana => write!(f, "solana"),
            ChainFamily::Ton => write!(f, "ton"),
        }
    }
}

/// Static description of a supported network
struct NetworkPreset {
    name: &'static str,
    family: ChainFamily,
    symbol: &'static str,
    decimals: u32,
    rpc_url: &'static str,
    explorer_api_url: Option<&'static str>,
    indexer_chain: Option<&'static str>,
}

const PRESETS: &[NetworkPreset] = &[
    NetworkPreset {
        name: "ethereum",
        family: ChainFamily::Evm,
        symbol: "ETH",
        decimals: 18,
        rpc_url: "https://eth.llamarpc.com",
        explorer_api_url: Some("https://api.etherscan.io/api"),
        indexer_chain: Some("0x1"),
    },
    NetworkPreset {
        name: "bnb",
        family: ChainFamily::Evm,
        symbol: "BNB",
        decimals: 18,
        rpc_url: "https://bsc-dataseed.binance.org",
        explorer_api_url: Some("https://api.bscscan.com/api"),
        indexer_chain: Some("0x38"),
    },
    NetworkPreset {
        name: "polygon",
        family: ChainFamily::Evm,
        symbol: "MATIC",
        decimals: 18,
        rpc_url: "https://polygon-rpc.com",
        explorer_api_url: Some("https://api.polygonscan.com/api"),
        indexer_chain: Some("0x89"),
    },
    NetworkPreset {
        name: "solana",
        family: ChainFamily::Solana,
        symbol: "SOL",
        decimals: 9,
        rpc_url: "https://api.mainnet-beta.solana.com",
        explorer_api_url: None,
        indexer_chain: Some("mainnet"),
    },
    NetworkPreset {
        name: "ton",
        family: ChainFamily::Ton,
        symbol: "TON",
        decimals: 9,
        rpc_url: "https://toncenter.com/api/v2/jsonRPC",
        explorer_api_url: None,
        indexer_chain: None,
    },
];

/// Names accepted for the active network
pub fn supported_networks() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

/// Immutable description of the active network, built once at startup
#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfig {
    pub name: String,
    pub family: ChainFamily,
    pub symbol: String,
    pub decimals: u32,
    pub rpc_urls: Vec<String>,
    pub explorer_api_url: Option<String>,
    #[serde(skip_serializing)]
    pub explorer_api_key: Option<String>,
    /// Chain identifier understood by the token/NFT indexer (`0x1`, `mainnet`, ...)
    pub indexer_chain: Option<String>,
    #[serde(skip_serializing)]
    pub indexer_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub rpc_api_key: Option<String>,
    pub request_timeout: Duration,
}

impl NetworkConfig {
    /// Resolve the active network from settings against the built-in presets
    pub fn resolve(settings: &NetworkSettings) -> Result<Self> {
        let name = settings.active.trim().to_lowercase();
        let preset = PRESETS.iter().find(|p| p.name == name).ok_or_else(|| {
            anyhow!(
                "Unsupported network '{}', expected one of: {}",
                settings.active,
                supported_networks().join(", ")
            )
        })?;

        let rpc_urls = if settings.rpc_urls.is_empty() {
            vec![preset.rpc_url.to_string()]
        } else {
            settings.rpc_urls.clone()
        };

        for rpc in &rpc_urls {
            url::Url::parse(rpc).map_err(|e| anyhow!("Invalid RPC URL '{}': {}", rpc, e))?;
        }

        let rpc_api_key = match preset.family {
            ChainFamily::Ton => settings.ton_api_key.clone(),
            _ => None,
        };

        Ok(Self {
            name: preset.name.to_string(),
            family: preset.family,
            symbol: preset.symbol.to_string(),
            decimals: preset.decimals,
            rpc_urls,
            explorer_api_url: preset.explorer_api_url.map(str::to_string),
            explorer_api_key: settings.explorer_api_key.clone(),
            indexer_chain: preset.indexer_chain.map(str::to_string),
            indexer_api_key: settings.moralis_api_key.clone(),
            rpc_api_key,
            request_timeout: settings.request_timeout(),
        })
    }

    /// First configured RPC endpoint
    pub fn primary_rpc(&self) -> &str {
        self.rpc_urls.first().map(String::as_str).unwrap_or_default()
    }
}
