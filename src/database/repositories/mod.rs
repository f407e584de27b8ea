pub mod alerts;
pub mod balances;
pub mod watchlist;

pub use alerts::AlertRepository;
pub use balances::BalanceRepository;
pub use watchlist::WatchlistRepository;
