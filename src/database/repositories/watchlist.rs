use crate::database::models::WatchedWallet;
use crate::database::store::KeyValueStore;
use crate::errors::WalletError;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

const WATCHLIST_KEY: &str = "watchlist";

/// Persisted set of watched wallets, keyed by address
#[derive(Clone)]
pub struct WatchlistRepository {
    store: Arc<dyn KeyValueStore>,
}

impl WatchlistRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Insert or replace the entry for `wallet.address`
    pub async fn upsert(&self, wallet: &WatchedWallet) -> Result<(), WalletError> {
        let value = serde_json::to_string(wallet)?;
        self.store.hset(WATCHLIST_KEY, &wallet.address, &value).await?;
        info!("Watching wallet {}", wallet.address);
        Ok(())
    }

    pub async fn contains(&self, address: &str) -> Result<bool, WalletError> {
        Ok(self.store.hget(WATCHLIST_KEY, address).await?.is_some())
    }

    /// Every watched wallet by address. Entries that no longer deserialize are skipped.
    pub async fn find_all(&self) -> Result<HashMap<String, WatchedWallet>, WalletError> {
        let entries = self.store.hgetall(WATCHLIST_KEY).await?;
        let mut wallets = HashMap::with_capacity(entries.len());

        for (address, value) in entries {
            match serde_json::from_str::<WatchedWallet>(&value) {
                Ok(wallet) => {
                    wallets.insert(address, wallet);
                }
                Err(e) => warn!("Skipping malformed watchlist entry {}: {}", address, e),
            }
        }

        debug!("Loaded {} watched wallets", wallets.len());
        Ok(wallets)
    }

    /// Returns whether the address was being watched
    pub async fn remove(&self, address: &str) -> Result<bool, WalletError> {
        let removed = self.store.hdel(WATCHLIST_KEY, address).await?;
        if removed {
            info!("Stopped watching wallet {}", address);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn repository() -> (Arc<MemoryStore>, WatchlistRepository) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), WatchlistRepository::new(store))
    }

    #[tokio::test]
    async fn test_upsert_and_list_round_trip() {
        let (_, repo) = repository();
        let wallet = WatchedWallet {
            address: "0xabc".to_string(),
            label: Some("cold storage".to_string()),
            added_at: 1_700_000_000,
        };
        repo.upsert(&wallet).await.unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("0xabc"), Some(&wallet));
    }

    #[tokio::test]
    async fn test_rewatch_replaces_entry() {
        let (_, repo) = repository();
        repo.upsert(&WatchedWallet {
            address: "0xabc".to_string(),
            label: Some("old".to_string()),
            added_at: 1,
        })
        .await
        .unwrap();
        repo.upsert(&WatchedWallet {
            address: "0xabc".to_string(),
            label: None,
            added_at: 2,
        })
        .await
        .unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        let wallet = &all["0xabc"];
        assert_eq!(wallet.label, None);
        assert_eq!(wallet.added_at, 2);
    }

    #[tokio::test]
    async fn test_remove_and_malformed_entries() {
        let (store, repo) = repository();
        repo.upsert(&WatchedWallet::new("0xabc".to_string(), None))
            .await
            .unwrap();
        store.hset(WATCHLIST_KEY, "0xbad", "not json").await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 1);
        assert!(repo.contains("0xabc").await.unwrap());
        assert!(repo.remove("0xabc").await.unwrap());
        assert!(!repo.remove("0xabc").await.unwrap());
        assert!(!repo.contains("0xabc").await.unwrap());
    }
}
