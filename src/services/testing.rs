//! Scriptable in-memory provider for service tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::chains::{ChainProvider, NetworkConfig, NftItem, RawTokenBalance, RawTransaction};
use crate::config::NetworkSettings;
use crate::errors::WalletError;

pub const WALLET_A: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
pub const WALLET_B: &str = "0x1111111111111111111111111111111111111111";

#[derive(Default)]
pub struct FakeProvider {
    network: Option<NetworkConfig>,
    balances: Mutex<HashMap<String, Result<String, WalletError>>>,
    transactions: Mutex<Vec<RawTransaction>>,
    tokens: Mutex<Vec<RawTokenBalance>>,
    pub balance_calls: AtomicUsize,
    pub transaction_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn ethereum() -> Arc<Self> {
        let settings = NetworkSettings {
            active: "ethereum".to_string(),
            ..NetworkSettings::default()
        };
        Arc::new(Self {
            network: NetworkConfig::resolve(&settings).ok(),
            ..Self::default()
        })
    }

    /// Raw balance in wei
    pub fn set_balance(&self, address: &str, wei: &str) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), Ok(wei.to_string()));
    }

    pub fn fail_balance(&self, address: &str, error: WalletError) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), Err(error));
    }

    pub fn set_transactions(&self, transactions: Vec<RawTransaction>) {
        *self.transactions.lock().unwrap() = transactions;
    }

    pub fn set_tokens(&self, tokens: Vec<RawTokenBalance>) {
        *self.tokens.lock().unwrap() = tokens;
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainProvider for FakeProvider {
    fn network(&self) -> &NetworkConfig {
        self.network.as_ref().expect("ethereum preset resolves")
    }

    async fn native_balance(&self, address: &str) -> Result<String, WalletError> {
        self.normalize_address(address)?;
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balances
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| Ok("0".to_string()))
    }

    async fn transactions(&self, address: &str, limit: usize) -> Result<Vec<RawTransaction>, WalletError> {
        self.normalize_address(address)?;
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn token_balances(&self, address: &str) -> Result<Vec<RawTokenBalance>, WalletError> {
        self.normalize_address(address)?;
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn nfts(&self, address: &str) -> Result<Vec<NftItem>, WalletError> {
        self.normalize_address(address)?;
        Err(WalletError::ProviderUnavailable("MORALIS_API_KEY is not set".to_string()))
    }
}
