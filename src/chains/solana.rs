use async_trait::async_trait;
use log::debug;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status_client_types::TransactionConfirmationStatus;
use std::str::FromStr;
use std::sync::Arc;

use super::indexer::IndexerClient;
use super::network::NetworkConfig;
use super::types::{NftItem, RawTokenBalance, RawTransaction, TransactionStatus};
use super::ChainProvider;
use crate::errors::WalletError;

/// Solana mainnet: balances and signatures over JSON-RPC, SPL tokens and
/// Metaplex NFTs through the indexer
pub struct SolanaProvider {
    network: NetworkConfig,
    rpc_client: Arc<RpcClient>,
    indexer: IndexerClient,
}

impl SolanaProvider {
    pub fn new(network: NetworkConfig, indexer: IndexerClient) -> Self {
        let rpc_client = RpcClient::new_with_timeout_and_commitment(
            network.primary_rpc().to_string(),
            network.request_timeout,
            CommitmentConfig::confirmed(),
        );
        Self {
            network,
            rpc_client: Arc::new(rpc_client),
            indexer,
        }
    }

    fn cluster(&self) -> &str {
        self.network.indexer_chain.as_deref().unwrap_or("mainnet")
    }

    fn pubkey(&self, address: &str) -> Result<(String, Pubkey), WalletError> {
        let address = self.normalize_address(address)?;
        let pubkey = Pubkey::from_str(&address)
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?;
        Ok((address, pubkey))
    }
}

#[async_trait]
impl ChainProvider for SolanaProvider {
    fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn native_balance(&self, address: &str) -> Result<String, WalletError> {
        let (address, pubkey) = self.pubkey(address)?;
        let lamports = self
            .rpc_client
            .get_balance(&pubkey)
            .await
            .map_err(|e| rpc_failure("getBalance", e))?;
        debug!("Balance of {}: {} lamports", address, lamports);
        Ok(lamports.to_string())
    }

    async fn transactions(&self, address: &str, limit: usize) -> Result<Vec<RawTransaction>, WalletError> {
        let (address, pubkey) = self.pubkey(address)?;
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            ..GetConfirmedSignaturesForAddress2Config::default()
        };

        let signatures = self
            .rpc_client
            .get_signatures_for_address_with_config(&pubkey, config)
            .await
            .map_err(|e| rpc_failure("getSignaturesForAddress", e))?;

        Ok(signatures
            .into_iter()
            .take(limit)
            .map(|sig| map_signature(sig, &address))
            .collect())
    }

    async fn token_balances(&self, address: &str) -> Result<Vec<RawTokenBalance>, WalletError> {
        let (address, _) = self.pubkey(address)?;
        self.indexer.solana_tokens(&address, self.cluster()).await
    }

    async fn nfts(&self, address: &str) -> Result<Vec<NftItem>, WalletError> {
        let (address, _) = self.pubkey(address)?;
        self.indexer
            .solana_nfts(&address, self.cluster(), &self.network.name)
            .await
    }
}

fn rpc_failure(method: &str, error: ClientError) -> WalletError {
    match error.kind() {
        ClientErrorKind::Reqwest(e) if e.is_timeout() => {
            WalletError::UpstreamTimeout(format!("{}: {}", method, e))
        }
        _ => WalletError::Upstream(format!("{} failed: {}", method, error)),
    }
}

/// Signatures carry no transfer details; the queried address is reported as sender
fn map_signature(sig: RpcConfirmedTransactionStatusWithSignature, address: &str) -> RawTransaction {
    let status = match (&sig.err, &sig.confirmation_status) {
        (Some(_), _) => TransactionStatus::Failed,
        (None, Some(TransactionConfirmationStatus::Processed)) => TransactionStatus::Pending,
        _ => TransactionStatus::Success,
    };

    RawTransaction {
        hash: sig.signature,
        from: address.to_string(),
        to: String::new(),
        value_raw: "0".to_string(),
        timestamp: sig
            .block_time
            .and_then(|t| u64::try_from(t).ok())
            .unwrap_or_default(),
        status,
    }
}
