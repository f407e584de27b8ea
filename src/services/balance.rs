use std::sync::Arc;

use super::cache::{keys, CacheLayer};
use crate::chains::{ChainProvider, WalletBalance};
use crate::config::CacheTtlConfig;
use crate::errors::WalletError;
use crate::utils::amount::format_balance;

/// Cache-backed native balance lookup shared by the wallet views and the monitor
#[derive(Clone)]
pub struct BalanceReader {
    provider: Arc<dyn ChainProvider>,
    cache: CacheLayer,
    ttl: CacheTtlConfig,
}

impl BalanceReader {
    pub fn new(provider: Arc<dyn ChainProvider>, cache: CacheLayer, ttl: CacheTtlConfig) -> Self {
        Self {
            provider,
            cache,
            ttl,
        }
    }

    /// Native balance as a decimal string in whole units, keyed by the
    /// canonical form of `address`
    pub async fn read(&self, address: &str) -> Result<WalletBalance, WalletError> {
        let address = self.provider.normalize_address(address)?;

        let provider = self.provider.clone();
        let owned = address.clone();
        let cached = self
            .cache
            .get_or_compute(&keys::balance(&address), self.ttl.balance(), move || async move {
                let raw = provider.native_balance(&owned).await?;
                format_balance(&raw, provider.decimals())
            })
            .await?;

        let network = self.provider.network();
        Ok(WalletBalance {
            address,
            balance: cached.value,
            symbol: network.symbol.clone(),
            network: network.name.clone(),
            cached: cached.from_cache,
        })
    }
}
