use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use super::balance::BalanceReader;
use crate::config::MonitorConfig;
use crate::database::models::{BalanceAlert, WatchedWallet};
use crate::database::repositories::{AlertRepository, BalanceRepository, WatchlistRepository};
use crate::errors::WalletError;
use crate::utils::amount::{has_changed, is_decimal};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Published for every detected balance change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChangedEvent {
    pub alert: BalanceAlert,
    pub label: Option<String>,
}

/// Watched wallet with the balance fetched during this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedWalletStatus {
    #[serde(flatten)]
    pub wallet: WatchedWallet,
    pub balance: String,
    pub symbol: String,
}

/// Address whose evaluation was skipped this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFailure {
    pub address: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistReport {
    pub wallets: Vec<WatchedWalletStatus>,
    pub failures: Vec<WalletFailure>,
    #[serde(skip)]
    pub alerts_raised: usize,
}

/// Change detector over the watchlist.
///
/// One evaluation cycle fetches every watched balance, compares it with the
/// stored baseline, records an alert on change and then advances the baseline.
/// Evaluations of the same address never interleave; a failed fetch leaves
/// that address untouched for the cycle.
pub struct BalanceMonitor {
    reader: BalanceReader,
    watchlist: WatchlistRepository,
    baselines: BalanceRepository,
    alerts: AlertRepository,
    config: MonitorConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
    events: broadcast::Sender<BalanceChangedEvent>,
}

enum Evaluation {
    Unchanged(WatchedWalletStatus),
    Changed(WatchedWalletStatus),
    /// Unwatched after the cycle listed it
    Removed,
}

impl BalanceMonitor {
    pub fn new(
        reader: BalanceReader,
        watchlist: WatchlistRepository,
        baselines: BalanceRepository,
        alerts: AlertRepository,
        config: MonitorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            reader,
            watchlist,
            baselines,
            alerts,
            config,
            locks: DashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BalanceChangedEvent> {
        self.events.subscribe()
    }

    /// Evaluate every watched wallet once
    pub async fn run_cycle(&self) -> Result<WatchlistReport, WalletError> {
        let mut wallets: Vec<WatchedWallet> = self.watchlist.find_all().await?.into_values().collect();
        wallets.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.address.cmp(&b.address))
        });

        debug!("Evaluating {} watched wallets", wallets.len());
        let outcomes = join_all(wallets.into_iter().map(|wallet| self.evaluate(wallet))).await;

        let mut report = WatchlistReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(Evaluation::Unchanged(status)) => report.wallets.push(status),
                Ok(Evaluation::Changed(status)) => {
                    report.alerts_raised += 1;
                    report.wallets.push(status);
                }
                Ok(Evaluation::Removed) => {}
                Err(failure) => report.failures.push(failure),
            }
        }

        Ok(report)
    }

    /// Clear the baseline of a wallet that left the watchlist.
    ///
    /// Runs under the address lock, after the watchlist entry is gone, so an
    /// evaluation still in flight either finishes first or sees the removal.
    /// The lock entry itself is kept so a later re-watch reuses it.
    pub async fn forget(&self, address: &str) -> Result<(), WalletError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;
        self.baselines.clear(address).await
    }

    fn lock_for(&self, address: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn evaluate(&self, wallet: WatchedWallet) -> Result<Evaluation, WalletFailure> {
        let address = wallet.address.clone();
        let failure = |error: WalletError| {
            warn!("Skipping {} this cycle: {}", address, error);
            WalletFailure {
                address: address.clone(),
                error: error.to_string(),
            }
        };

        let lock = self.lock_for(&address);
        let _guard = lock.lock().await;

        if !self.watchlist.contains(&address).await.map_err(failure)? {
            debug!("{} was unwatched during the cycle", address);
            return Ok(Evaluation::Removed);
        }

        let current = self.reader.read(&address).await.map_err(failure)?;
        let previous = self
            .baselines
            .last_known(&address)
            .await
            .map_err(failure)?
            .filter(|stored| {
                let valid = is_decimal(stored);
                if !valid {
                    warn!("Ignoring unreadable baseline '{}' for {}", stored, address);
                }
                valid
            });

        let previous = match previous {
            Some(previous) => Some(previous),
            None if self.config.alert_on_first_observation => Some("0".to_string()),
            None => None,
        };

        let changed = match &previous {
            Some(previous) => {
                has_changed(previous, &current.balance, &self.config.change_threshold).map_err(failure)?
            }
            None => false,
        };

        if changed {
            let alert = BalanceAlert::new(
                address.clone(),
                current.network.clone(),
                previous.unwrap_or_default(),
                current.balance.clone(),
                current.symbol.clone(),
            );
            self.alerts.append(&alert).await.map_err(failure)?;

            // No subscribers is fine
            let _ = self.events.send(BalanceChangedEvent {
                alert,
                label: wallet.label.clone(),
            });
        }

        self.baselines
            .record(&address, &current.balance)
            .await
            .map_err(failure)?;

        let status = WatchedWalletStatus {
            wallet,
            balance: current.balance,
            symbol: current.symbol,
        };

        if changed {
            info!("Balance of {} changed to {}", address, status.balance);
            Ok(Evaluation::Changed(status))
        } else {
            Ok(Evaluation::Unchanged(status))
        }
    }
}
