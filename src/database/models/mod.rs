pub mod alert;
pub mod wallet;

pub use alert::BalanceAlert;
pub use wallet::WatchedWallet;
