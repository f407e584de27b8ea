pub mod routes;
pub mod wallet;

pub use routes::*;
