use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::store::{resolve_range, KeyValueStore};
use crate::errors::WalletError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// In-process store used by tests and by `--memory-store` runs.
///
/// Expiry is lazy: an expired entry stays in the map until overwritten or
/// deleted, it is just never returned.
#[derive(Debug, Default)]
pub struct MemoryStore {
    strings: RwLock<HashMap<String, Entry>>,
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    lists: RwLock<HashMap<String, VecDeque<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn put(&self, key: &str, value: &str, expires_at: Option<Instant>) {
        self.strings.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WalletError> {
        let strings = self.strings.read().await;
        Ok(strings
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WalletError> {
        self.put(key, value, None).await;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WalletError> {
        self.put(key, value, Some(Instant::now() + ttl)).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), WalletError> {
        self.strings.write().await.remove(key);
        self.hashes.write().await.remove(key);
        self.lists.write().await.remove(key);
        Ok(())
    }

    async fn hset(&self, hash: &str, field: &str, value: &str) -> Result<(), WalletError> {
        self.hashes
            .write()
            .await
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hget(&self, hash: &str, field: &str) -> Result<Option<String>, WalletError> {
        let hashes = self.hashes.read().await;
        Ok(hashes.get(hash).and_then(|fields| fields.get(field)).cloned())
    }

    async fn hgetall(&self, hash: &str) -> Result<HashMap<String, String>, WalletError> {
        let hashes = self.hashes.read().await;
        Ok(hashes.get(hash).cloned().unwrap_or_default())
    }

    async fn hdel(&self, hash: &str, field: &str) -> Result<bool, WalletError> {
        let mut hashes = self.hashes.write().await;
        Ok(hashes
            .get_mut(hash)
            .map(|fields| fields.remove(field).is_some())
            .unwrap_or(false))
    }

    async fn lpush_trim(&self, key: &str, value: &str, cap: usize) -> Result<(), WalletError> {
        let mut lists = self.lists.write().await;
        let list = lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        list.truncate(cap);
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, WalletError> {
        let lists = self.lists.read().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };

        Ok(match resolve_range(list.len(), start, stop) {
            Some((from, to)) => list.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires() {
        let store = MemoryStore::new();
        store
            .set_ex("balance:a", "1.0", Duration::from_secs(30))
            .await
            .unwrap();
        store.set("last_balance:a", "2.0").await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(store.get("balance:a").await.unwrap().as_deref(), Some("1.0"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("balance:a").await.unwrap(), None);
        assert_eq!(
            store.get("last_balance:a").await.unwrap().as_deref(),
            Some("2.0")
        );
    }

    #[tokio::test]
    async fn test_hash_operations() {
        let store = MemoryStore::new();
        store.hset("watchlist", "a", "{}").await.unwrap();
        store.hset("watchlist", "b", "{}").await.unwrap();
        store.hset("watchlist", "a", "{\"x\":1}").await.unwrap();

        let all = store.hgetall("watchlist").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("a").map(String::as_str), Some("{\"x\":1}"));
        assert_eq!(store.hget("watchlist", "b").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.hget("watchlist", "c").await.unwrap(), None);

        assert!(store.hdel("watchlist", "a").await.unwrap());
        assert!(!store.hdel("watchlist", "a").await.unwrap());
        assert!(store.hgetall("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lpush_trim_keeps_newest() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .lpush_trim("wallet:alerts", &i.to_string(), 3)
                .await
                .unwrap();
        }

        let items = store.lrange("wallet:alerts", 0, -1).await.unwrap();
        assert_eq!(items, vec!["4", "3", "2"]);
        assert_eq!(store.lrange("wallet:alerts", 1, 1).await.unwrap(), vec!["3"]);
        assert!(store.lrange("nothing", 0, -1).await.unwrap().is_empty());
    }
}
