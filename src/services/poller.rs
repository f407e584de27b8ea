use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::monitor::BalanceMonitor;

/// Lifecycle of a long-running background service
#[async_trait::async_trait]
pub trait BackgroundService {
    async fn start(&mut self);
    async fn stop(&mut self);
    async fn is_running(&self) -> bool;
}

/// Runs a watchlist evaluation cycle on a fixed interval
pub struct WatchlistPoller {
    monitor: Arc<BalanceMonitor>,
    interval: Duration,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl WatchlistPoller {
    pub fn new(monitor: Arc<BalanceMonitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            shutdown: None,
            handle: None,
        }
    }
}

#[async_trait::async_trait]
impl BackgroundService for WatchlistPoller {
    async fn start(&mut self) {
        if self.is_running().await {
            return;
        }
        info!("Starting watchlist poller every {:?}", self.interval);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let monitor = self.monitor.clone();
        let period = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                match monitor.run_cycle().await {
                    Ok(report) => info!(
                        "Watchlist poll: {} wallets, {} alerts, {} failures",
                        report.wallets.len(),
                        report.alerts_raised,
                        report.failures.len()
                    ),
                    Err(e) => error!("Watchlist poll failed: {}", e),
                }
            }

            info!("Watchlist poller stopped");
        }));
        self.shutdown = Some(shutdown_tx);
    }

    async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Watchlist poller task failed: {}", e);
            }
        }
    }

    async fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheTtlConfig, MonitorConfig};
    use crate::database::MemoryStore;
    use crate::services::testing::{FakeProvider, WALLET_A};
    use crate::services::WalletService;

    #[tokio::test(start_paused = true)]
    async fn test_poller_runs_cycles_until_stopped() {
        let provider = FakeProvider::ethereum();
        provider.set_balance(WALLET_A, "3000000000000000000");
        let service = WalletService::new(
            provider.clone(),
            Arc::new(MemoryStore::new()),
            CacheTtlConfig {
                balance_secs: 1,
                ..CacheTtlConfig::default()
            },
            MonitorConfig::default(),
        );
        service.watch_wallet(WALLET_A, None).await.unwrap();

        let mut poller = WatchlistPoller::new(service.monitor(), Duration::from_secs(10));
        assert!(!poller.is_running().await);
        poller.start().await;
        assert!(poller.is_running().await);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(provider.balance_calls(), 3);
        assert_eq!(service.get_alerts().await.unwrap().len(), 1);

        poller.stop().await;
        assert!(!poller.is_running().await);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(provider.balance_calls(), 3);
    }
}
