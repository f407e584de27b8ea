use log::{debug, info};
use std::sync::Arc;

use super::balance::BalanceReader;
use super::cache::{keys, CacheLayer};
use super::monitor::{BalanceMonitor, WatchlistReport};
use crate::chains::{
    ChainProvider, NftItem, TokenBalance, Transaction, TransactionList, WalletBalance,
};
use crate::config::{CacheTtlConfig, MonitorConfig};
use crate::database::models::{BalanceAlert, WatchedWallet};
use crate::database::repositories::{AlertRepository, BalanceRepository, WatchlistRepository};
use crate::database::KeyValueStore;
use crate::errors::WalletError;
use crate::utils::amount::to_decimal;
use crate::utils::amount::DEFAULT_DISPLAY_PRECISION;

pub const DEFAULT_TRANSACTION_LIMIT: usize = 10;
pub const MAX_TRANSACTION_LIMIT: usize = 100;
pub const MAX_LABEL_LEN: usize = 64;

/// Entry point for every wallet operation exposed over HTTP.
///
/// Addresses are validated against the active network and reduced to their
/// canonical form before any cache, store or provider access.
pub struct WalletService {
    provider: Arc<dyn ChainProvider>,
    cache: CacheLayer,
    ttl: CacheTtlConfig,
    balances: BalanceReader,
    watchlist: WatchlistRepository,
    alerts: AlertRepository,
    monitor: Arc<BalanceMonitor>,
}

impl WalletService {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn KeyValueStore>,
        ttl: CacheTtlConfig,
        monitor_config: MonitorConfig,
    ) -> Self {
        let cache = CacheLayer::new(store.clone());
        let balances = BalanceReader::new(provider.clone(), cache.clone(), ttl);
        let watchlist = WatchlistRepository::new(store.clone());
        let alerts = AlertRepository::new(store.clone(), monitor_config.alert_history_cap);
        let monitor = Arc::new(BalanceMonitor::new(
            balances.clone(),
            watchlist.clone(),
            BalanceRepository::new(store),
            alerts.clone(),
            monitor_config,
        ));

        Self {
            provider,
            cache,
            ttl,
            balances,
            watchlist,
            alerts,
            monitor,
        }
    }

    pub fn monitor(&self) -> Arc<BalanceMonitor> {
        self.monitor.clone()
    }

    pub async fn get_balance(&self, address: &str) -> Result<WalletBalance, WalletError> {
        self.balances.read(address).await
    }

    /// Most recent transactions first; `limit` is clamped to 1..=100
    pub async fn get_transactions(&self, address: &str, limit: usize) -> Result<TransactionList, WalletError> {
        let address = self.provider.normalize_address(address)?;
        let limit = limit.clamp(1, MAX_TRANSACTION_LIMIT);

        let provider = self.provider.clone();
        let owned = address.clone();
        let cached = self
            .cache
            .get_or_compute(
                &keys::transactions(&address, limit),
                self.ttl.transactions(),
                move || async move {
                    let raw = provider.transactions(&owned, limit).await?;
                    raw.into_iter()
                        .map(|tx| {
                            Ok(Transaction {
                                value: to_decimal(&tx.value_raw, provider.decimals(), DEFAULT_DISPLAY_PRECISION)?,
                                hash: tx.hash,
                                from: tx.from,
                                to: tx.to,
                                timestamp: tx.timestamp,
                                status: tx.status,
                            })
                        })
                        .collect::<Result<Vec<_>, WalletError>>()
                },
            )
            .await?;

        debug!("{} transactions for {}", cached.value.len(), address);
        Ok(TransactionList {
            address,
            transactions: cached.value,
            network: self.provider.network().name.clone(),
            cached: cached.from_cache,
        })
    }

    pub async fn get_token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, WalletError> {
        let address = self.provider.normalize_address(address)?;

        let provider = self.provider.clone();
        let owned = address.clone();
        let cached = self
            .cache
            .get_or_compute(&keys::tokens(&address), self.ttl.tokens(), move || async move {
                let network = provider.network().name.clone();
                let raw = provider.token_balances(&owned).await?;
                raw.into_iter()
                    .map(|token| {
                        Ok(TokenBalance {
                            balance: to_decimal(&token.amount_raw, token.decimals, DEFAULT_DISPLAY_PRECISION)?,
                            contract_address: token.contract,
                            name: token.name,
                            symbol: token.symbol,
                            decimals: token.decimals,
                            network: network.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, WalletError>>()
            })
            .await?;

        Ok(cached.value)
    }

    pub async fn get_nfts(&self, address: &str) -> Result<Vec<NftItem>, WalletError> {
        let address = self.provider.normalize_address(address)?;

        let provider = self.provider.clone();
        let owned = address.clone();
        let cached = self
            .cache
            .get_or_compute(&keys::nfts(&address), self.ttl.nfts(), move || async move {
                provider.nfts(&owned).await
            })
            .await?;

        Ok(cached.value)
    }

    /// Add or replace a watchlist entry
    pub async fn watch_wallet(&self, address: &str, label: Option<String>) -> Result<WatchedWallet, WalletError> {
        let address = self.provider.normalize_address(address)?;
        let label = normalize_label(label)?;

        let wallet = WatchedWallet::new(address, label);
        self.watchlist.upsert(&wallet).await?;
        Ok(wallet)
    }

    /// Returns false when the address was not on the watchlist
    pub async fn unwatch_wallet(&self, address: &str) -> Result<bool, WalletError> {
        let address = self.provider.normalize_address(address)?;
        let removed = self.watchlist.remove(&address).await?;
        if removed {
            self.monitor.forget(&address).await?;
        }
        Ok(removed)
    }

    /// Watched wallets with live balances; runs one evaluation cycle
    pub async fn get_watched_wallets(&self) -> Result<WatchlistReport, WalletError> {
        let report = self.monitor.run_cycle().await?;
        info!(
            "Watchlist cycle: {} wallets, {} alerts, {} failures",
            report.wallets.len(),
            report.alerts_raised,
            report.failures.len()
        );
        Ok(report)
    }

    /// Alert history, newest first
    pub async fn get_alerts(&self) -> Result<Vec<BalanceAlert>, WalletError> {
        self.alerts.list().await
    }
}

fn normalize_label(label: Option<String>) -> Result<Option<String>, WalletError> {
    let Some(label) = label else {
        return Ok(None);
    };

    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_LABEL_LEN {
        return Err(WalletError::InvalidInput(format!(
            "label must be at most {} characters",
            MAX_LABEL_LEN
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{RawTokenBalance, RawTransaction, TransactionStatus};
    use crate::database::MemoryStore;
    use crate::services::testing::{FakeProvider, WALLET_A, WALLET_B};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn service() -> (Arc<FakeProvider>, WalletService) {
        let provider = FakeProvider::ethereum();
        let service = WalletService::new(
            provider.clone(),
            Arc::new(MemoryStore::new()),
            CacheTtlConfig::default(),
            MonitorConfig::default(),
        );
        (provider, service)
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_is_cached_for_ttl() {
        let (provider, service) = service();
        provider.set_balance(WALLET_A, "1234567890000000000");

        let first = service.get_balance(WALLET_A).await.unwrap();
        assert_eq!(first.balance, "1.234567");
        assert_eq!(first.symbol, "ETH");
        assert_eq!(first.network, "ethereum");
        assert!(!first.cached);

        let second = service.get_balance(WALLET_A).await.unwrap();
        assert!(second.cached);
        assert_eq!(provider.balance_calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let third = service.get_balance(WALLET_A).await.unwrap();
        assert!(!third.cached);
        assert_eq!(provider.balance_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_address_never_reaches_provider() {
        let (provider, service) = service();

        let err = service.get_balance("0x123").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
        let err = service.get_transactions("not-an-address", 10).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
        let err = service.watch_wallet("0x123", None).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));

        assert_eq!(provider.balance_calls(), 0);
        assert_eq!(provider.transaction_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transactions_are_formatted_and_limited() {
        let (provider, service) = service();
        provider.set_transactions(
            (0..5)
                .map(|i| RawTransaction {
                    hash: format!("0x{:02}", i),
                    from: WALLET_A.to_string(),
                    to: WALLET_B.to_string(),
                    value_raw: "1500000000000000000".to_string(),
                    timestamp: 1_700_000_000 - i,
                    status: TransactionStatus::Success,
                })
                .collect(),
        );

        let list = service.get_transactions(WALLET_A, 3).await.unwrap();
        assert_eq!(list.transactions.len(), 3);
        assert_eq!(list.transactions[0].value, "1.500000");
        assert_eq!(list.transactions[0].hash, "0x00");
        assert!(!list.cached);

        let again = service.get_transactions(WALLET_A, 3).await.unwrap();
        assert!(again.cached);

        // Different limits are cached separately
        let clamped = service.get_transactions(WALLET_A, 0).await.unwrap();
        assert_eq!(clamped.transactions.len(), 1);
        assert_eq!(provider.transaction_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_token_balances_use_token_decimals() {
        let (provider, service) = service();
        provider.set_tokens(vec![RawTokenBalance {
            contract: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
            name: "USD Coin".to_string(),
            symbol: "USDC".to_string(),
            amount_raw: "2500000".to_string(),
            decimals: 6,
        }]);

        let tokens = service.get_token_balances(WALLET_A).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].balance, "2.500000");
        assert_eq!(tokens[0].network, "ethereum");
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_an_error_not_empty() {
        let (_, service) = service();
        let err = service.get_nfts(WALLET_A).await.unwrap_err();
        assert!(matches!(err, WalletError::ProviderUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_list_round_trip() {
        let (provider, service) = service();
        provider.set_balance(WALLET_A, "10000000000000000000");

        let wallet = service
            .watch_wallet(WALLET_A, Some("  treasury ".to_string()))
            .await
            .unwrap();
        assert_eq!(wallet.label.as_deref(), Some("treasury"));

        let report = service.get_watched_wallets().await.unwrap();
        assert_eq!(report.wallets.len(), 1);
        assert_eq!(report.wallets[0].wallet, wallet);
        assert_eq!(report.wallets[0].balance, "10.000000");

        let alerts = service.get_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].previous_balance, "0");
        assert_eq!(alerts[0].current_balance, "10.000000");

        tokio::time::advance(Duration::from_secs(31)).await;
        service.get_watched_wallets().await.unwrap();
        assert_eq!(service.get_alerts().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_address_variants_share_one_watchlist_entry() {
        let (provider, service) = service();
        provider.set_balance(WALLET_A, "1000000000000000000");

        let padded = format!("{} ", WALLET_A);
        let lower = WALLET_A.to_lowercase();
        for variant in [WALLET_A, padded.as_str(), lower.as_str()] {
            let wallet = service.watch_wallet(variant, None).await.unwrap();
            assert_eq!(wallet.address, WALLET_A);
        }

        let report = service.get_watched_wallets().await.unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.wallets.len(), 1);
        assert_eq!(report.wallets[0].wallet.address, WALLET_A);
        assert_eq!(report.wallets[0].balance, "1.000000");

        // Views share one cache entry whatever the casing
        let balance = service.get_balance(&lower).await.unwrap();
        assert_eq!(balance.address, WALLET_A);
        assert!(balance.cached);
        assert_eq!(provider.balance_calls(), 1);

        assert!(service.unwatch_wallet(&padded).await.unwrap());
        assert!(service.get_watched_wallets().await.unwrap().wallets.is_empty());
    }

    #[tokio::test]
    async fn test_label_validation() {
        let (_, service) = service();
        let err = service
            .watch_wallet(WALLET_A, Some("x".repeat(65)))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));

        let wallet = service
            .watch_wallet(WALLET_A, Some("   ".to_string()))
            .await
            .unwrap();
        assert_eq!(wallet.label, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwatch_removes_entry_and_baseline() {
        let (provider, service) = service();
        provider.set_balance(WALLET_A, "1000000000000000000");
        service.watch_wallet(WALLET_A, None).await.unwrap();
        service.get_watched_wallets().await.unwrap();

        assert!(service.unwatch_wallet(WALLET_A).await.unwrap());
        assert!(!service.unwatch_wallet(WALLET_A).await.unwrap());
        assert!(service.get_watched_wallets().await.unwrap().wallets.is_empty());

        // Re-watching starts from an empty baseline again
        service.watch_wallet(WALLET_A, None).await.unwrap();
        service.get_watched_wallets().await.unwrap();
        assert_eq!(service.get_alerts().await.unwrap().len(), 2);
    }
}
