pub mod amount;

pub use amount::{format_balance, has_changed, to_decimal};
