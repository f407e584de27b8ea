//! Chain-provider abstraction.
//!
//! Every supported chain family implements [`ChainProvider`]. Exactly one
//! provider is built at startup for the configured network; the rest of the
//! service only talks to the trait object.

pub mod address;
pub mod evm;
pub mod indexer;
pub mod network;
pub mod rpc;
pub mod solana;
pub mod ton;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

pub use network::{ChainFamily, NetworkConfig};
pub use types::{
    NftItem, RawTokenBalance, RawTransaction, TokenBalance, Transaction, TransactionList,
    TransactionStatus, WalletBalance,
};

use crate::errors::WalletError;
use evm::EvmProvider;
use indexer::IndexerClient;
use solana::SolanaProvider;
use ton::TonProvider;

/// Uniform read-only access to one chain.
///
/// Implementations normalize and validate the address for their own family
/// before touching the network and fail with [`WalletError::InvalidAddress`]. Missing
/// credentials surface as [`WalletError::ProviderUnavailable`], never as empty data.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// The network this provider serves
    fn network(&self) -> &NetworkConfig;

    /// Validate `address` for this chain family and return its canonical form
    fn normalize_address(&self, address: &str) -> Result<String, WalletError> {
        address::normalize_address(self.network().family, address)
    }

    /// Native balance in raw units (wei, lamports, nanoTON) as an integer string
    async fn native_balance(&self, address: &str) -> Result<String, WalletError>;

    /// Up to `limit` transactions, most recent first
    async fn transactions(&self, address: &str, limit: usize) -> Result<Vec<RawTransaction>, WalletError>;

    /// Fungible token holdings
    async fn token_balances(&self, address: &str) -> Result<Vec<RawTokenBalance>, WalletError>;

    /// NFTs owned by the address
    async fn nfts(&self, address: &str) -> Result<Vec<NftItem>, WalletError>;

    /// Decimal exponent of the native currency
    fn decimals(&self) -> u32 {
        self.network().decimals
    }
}

/// Build the single active provider for `network`
pub fn build_provider(network: &NetworkConfig) -> Result<Arc<dyn ChainProvider>> {
    let http = rpc::http_client(network.request_timeout)?;
    let indexer = IndexerClient::new(http.clone(), network.indexer_api_key.clone());

    if !indexer.is_available() && network.family != ChainFamily::Ton {
        log::warn!("MORALIS_API_KEY is not set, token and NFT endpoints will not work");
    }

    let provider: Arc<dyn ChainProvider> = match network.family {
        ChainFamily::Evm => Arc::new(EvmProvider::new(network.clone(), http, indexer)?),
        ChainFamily::Solana => Arc::new(SolanaProvider::new(network.clone(), indexer)),
        ChainFamily::Ton => Arc::new(TonProvider::new(network.clone(), http)),
    };

    info!(
        "{} provider initialized: {} ({})",
        network.family,
        network.name,
        network.primary_rpc()
    );

    Ok(provider)
}
