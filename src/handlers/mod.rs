pub mod auth;
pub mod wallet;

pub use wallet::*;
