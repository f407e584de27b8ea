use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::{error, info, LevelFilter};
use std::sync::Arc;
use std::time::Duration;

use wallet_monitor_api::chains::{build_provider, NetworkConfig};
use wallet_monitor_api::config::Config;
use wallet_monitor_api::database::{KeyValueStore, MemoryStore, MongoDbClient, MongoStore};
use wallet_monitor_api::routes::configure_routes;
use wallet_monitor_api::services::{
    BackgroundService, NotificationHandler, WalletService, WatchlistPoller,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Keep all state in process memory instead of MongoDB
    #[arg(long)]
    memory_store: bool,

    /// Path of the TOML configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: String,
}

fn to_io_error(error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, error.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 1. Parse command line arguments and setup logging
    let args = Args::parse();
    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level.to_string())).init();

    // 2. Load configuration and resolve the active network
    let config = Arc::new(Config::load_or_env(&args.config));
    let network = NetworkConfig::resolve(&config.network).map_err(to_io_error)?;

    info!("Starting Wallet Monitor API...");
    info!(
        "Active network: {} ({}, {})",
        network.name, network.family, network.symbol
    );

    let provider = build_provider(&network).map_err(to_io_error)?;

    // 3. Storage backend
    let store: Arc<dyn KeyValueStore> = if args.memory_store {
        info!("Using in-memory store, state is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        config.database.validate().map_err(to_io_error)?;
        let client = MongoDbClient::init(&config.database)
            .await
            .map_err(to_io_error)?;
        Arc::new(MongoStore::new(client))
    };

    let service = web::Data::new(WalletService::new(
        provider,
        store,
        config.cache,
        config.monitor.clone(),
    ));

    // 4. Background consumers of the watchlist pipeline
    let notifications = NotificationHandler::new(service.monitor().subscribe());
    tokio::spawn(notifications.run());

    let mut poller = if config.monitor.poll_interval_secs > 0 {
        let mut poller = WatchlistPoller::new(
            service.monitor(),
            Duration::from_secs(config.monitor.poll_interval_secs),
        );
        poller.start().await;
        Some(poller)
    } else {
        info!("Background watchlist polling disabled");
        None
    };

    // Build bind address from config
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server will be available at http://{}", bind_addr);

    let server_config = config.clone();
    let result = HttpServer::new(move || {
        let allowed_origins = server_config.cors.allowed_origins.clone();
        let cors = Cors::default().allowed_origin_fn(move |origin, _req_head| {
            let origin_str = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };
            allowed_origins.iter().any(|allowed| origin_str == allowed)
        });

        let mut methods: Vec<actix_web::http::Method> = server_config
            .cors
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        methods.push(actix_web::http::Method::OPTIONS);

        let cors = cors
            .allowed_methods(methods)
            .allowed_headers(server_config.cors.allowed_headers.clone())
            .max_age(3600);

        let cors = if server_config.cors.supports_credentials {
            cors.supports_credentials()
        } else {
            cors
        };

        App::new()
            .app_data(service.clone())
            .app_data(web::Data::new(server_config.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&bind_addr)?
    .run()
    .await;

    if let Some(poller) = poller.as_mut() {
        poller.stop().await;
    }
    if let Err(e) = &result {
        error!("Server error: {}", e);
    }
    result
}
