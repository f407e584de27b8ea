pub mod balance;
pub mod cache;
pub mod monitor;
pub mod notification_handler;
pub mod poller;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheLayer, Cached};
pub use monitor::{BalanceChangedEvent, BalanceMonitor, WatchlistReport};
pub use notification_handler::NotificationHandler;
pub use poller::{BackgroundService, WatchlistPoller};
pub use wallet::WalletService;
