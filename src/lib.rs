pub mod chains;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod utils;
