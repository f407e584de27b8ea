use anyhow::{anyhow, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: MongoDbConfig,
    pub cors: CorsConfig,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub cache: CacheTtlConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MongoDbConfig {
    pub uri: String,
    pub database: String,
    pub connection_timeout_ms: u64,
    pub max_pool_size: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub supports_credentials: bool,
}

/// Raw network selection and credentials, resolved once at startup into a
/// [`crate::chains::NetworkConfig`]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkSettings {
    /// One of `ethereum`, `bnb`, `polygon`, `solana`, `ton`
    pub active: String,
    /// Overrides the built-in RPC endpoint(s) of the active network
    pub rpc_urls: Vec<String>,
    pub explorer_api_key: Option<String>,
    pub moralis_api_key: Option<String>,
    pub ton_api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            active: "ethereum".to_string(),
            rpc_urls: Vec::new(),
            explorer_api_key: None,
            moralis_api_key: None,
            ton_api_key: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl NetworkSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Cache lifetimes per resource kind, in seconds
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CacheTtlConfig {
    pub balance_secs: u64,
    pub transactions_secs: u64,
    pub tokens_secs: u64,
    pub nfts_secs: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            balance_secs: 30,
            transactions_secs: 60,
            tokens_secs: 120,
            nfts_secs: 300,
        }
    }
}

impl CacheTtlConfig {
    pub fn balance(&self) -> Duration {
        Duration::from_secs(self.balance_secs)
    }

    pub fn transactions(&self) -> Duration {
        Duration::from_secs(self.transactions_secs)
    }

    pub fn tokens(&self) -> Duration {
        Duration::from_secs(self.tokens_secs)
    }

    pub fn nfts(&self) -> Duration {
        Duration::from_secs(self.nfts_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    pub alert_history_cap: usize,
    /// Minimum absolute balance difference that counts as a change
    pub change_threshold: String,
    /// Raise an alert (previous = "0") the first time a wallet is observed
    pub alert_on_first_observation: bool,
    /// 0 disables the background poller
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alert_history_cap: 50,
            change_threshold: "0".to_string(),
            alert_on_first_observation: true,
            poll_interval_secs: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                log_level: "info".to_string(),
                api_key: None,
            },
            database: MongoDbConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "wallet_monitor".to_string(),
                connection_timeout_ms: 5000,
                max_pool_size: Some(10),
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
                allowed_methods: vec![
                    "GET".to_string(),
                    "POST".to_string(),
                    "DELETE".to_string(),
                ],
                allowed_headers: vec![
                    "Authorization".to_string(),
                    "X-API-Key".to_string(),
                    "Accept".to_string(),
                    "Content-Type".to_string(),
                ],
                supports_credentials: true,
            },
            network: NetworkSettings::default(),
            cache: CacheTtlConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl MongoDbConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(anyhow!("MongoDB URI not configured"));
        }

        if self.database.is_empty() {
            return Err(anyhow!("MongoDB database name not configured"));
        }

        Ok(())
    }
}

/// Environment variable holding the RPC override for a network name
fn rpc_env_var(network: &str) -> Option<&'static str> {
    match network {
        "ethereum" => Some("ETH_RPC_URL"),
        "bnb" => Some("BNB_RPC_URL"),
        "polygon" => Some("POLYGON_RPC_URL"),
        "solana" => Some("SOLANA_RPC_URL"),
        "ton" => Some("TON_RPC_URL"),
        _ => None,
    }
}

/// Environment variable holding the block explorer key for an EVM network name
fn explorer_key_env_var(network: &str) -> Option<&'static str> {
    match network {
        "ethereum" => Some("ETHERSCAN_API_KEY"),
        "bnb" => Some("BSCSCAN_API_KEY"),
        "polygon" => Some("POLYGONSCAN_API_KEY"),
        _ => None,
    }
}

impl Config {
    /// Load `path`, falling back to environment variables and defaults
    pub fn load_or_env<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());
        match Self::load_from_file(path) {
            Ok(config) => {
                info!("Config loaded from file");
                config
            }
            Err(e) => {
                error!("Failed to load config from file: {}", e);
                info!("Falling back to environment variables or defaults");
                Self::from_env()
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Config::default();

        // Override with environment variables if present
        if let Ok(host) = std::env::var("SERVER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                config.server.port = port_num;
            }
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            config.server.log_level = log_level;
        }

        if let Ok(api_key) = std::env::var("API_KEY") {
            config.server.api_key = Some(api_key);
        }

        if let Ok(uri) = std::env::var("MONGODB_URI") {
            config.database.uri = uri;
        }

        if let Ok(db_name) = std::env::var("MONGODB_DATABASE") {
            config.database.database = db_name;
        }

        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors.allowed_origins =
                origins.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Network selection and credentials
        if let Ok(network) = std::env::var("NETWORK") {
            config.network.active = network.trim().to_lowercase();
        }

        if let Some(var) = rpc_env_var(&config.network.active) {
            if let Ok(rpcs) = std::env::var(var) {
                config.network.rpc_urls = rpcs
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        if let Some(var) = explorer_key_env_var(&config.network.active) {
            config.network.explorer_api_key = non_empty_env(var);
        }

        config.network.moralis_api_key = non_empty_env("MORALIS_API_KEY");
        config.network.ton_api_key = non_empty_env("TON_API_KEY");

        if let Ok(interval) = std::env::var("WATCH_POLL_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                config.monitor.poll_interval_secs = secs;
            }
        }

        config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.uri, "mongodb://localhost:27017");
        assert_eq!(config.network.active, "ethereum");
        assert_eq!(config.cache, CacheTtlConfig::default());
        assert_eq!(config.monitor.alert_history_cap, 50);
        assert!(config.monitor.alert_on_first_observation);
    }

    #[test]
    fn test_default_ttls() {
        let ttl = CacheTtlConfig::default();
        assert_eq!(ttl.balance(), Duration::from_secs(30));
        assert_eq!(ttl.transactions(), Duration::from_secs(60));
        assert_eq!(ttl.tokens(), Duration::from_secs(120));
        assert_eq!(ttl.nfts(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("SERVER_PORT", "9090");
        std::env::set_var("NETWORK", "Solana");
        std::env::set_var("SOLANA_RPC_URL", "https://rpc-a.example, https://rpc-b.example");
        std::env::set_var("MORALIS_API_KEY", "moralis-key");

        let config = Config::from_env();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.network.active, "solana");
        assert_eq!(
            config.network.rpc_urls,
            vec!["https://rpc-a.example", "https://rpc-b.example"]
        );
        assert_eq!(config.network.moralis_api_key.as_deref(), Some("moralis-key"));

        // Clean up
        std::env::remove_var("SERVER_PORT");
        std::env::remove_var("NETWORK");
        std::env::remove_var("SOLANA_RPC_URL");
        std::env::remove_var("MORALIS_API_KEY");
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let toml_string = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            log_level = "debug"

            [database]
            uri = "mongodb://db:27017"
            database = "wallets"
            connection_timeout_ms = 2000

            [cors]
            allowed_origins = []
            allowed_methods = ["GET"]
            allowed_headers = []
            supports_credentials = false

            [network]
            active = "ton"

            [monitor]
            change_threshold = "0.01"
        "#;

        let config: Config = toml::from_str(toml_string).unwrap();
        assert_eq!(config.network.active, "ton");
        assert_eq!(config.network.request_timeout_ms, 10_000);
        assert_eq!(config.monitor.change_threshold, "0.01");
        assert_eq!(config.monitor.alert_history_cap, 50);
        assert_eq!(config.cache.nfts_secs, 300);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(toml_string.contains("127.0.0.1"));
        assert!(toml_string.contains("mongodb://localhost:27017"));
        assert!(toml_string.contains("balance_secs = 30"));
    }
}
