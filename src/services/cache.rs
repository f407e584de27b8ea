use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::database::KeyValueStore;
use crate::errors::WalletError;

type InFlight = Shared<BoxFuture<'static, Result<String, WalletError>>>;

/// Cache key layout shared with the persisted store
pub mod keys {
    pub fn balance(address: &str) -> String {
        format!("balance:{}", address)
    }

    pub fn transactions(address: &str, limit: usize) -> String {
        format!("txs:{}:{}", address, limit)
    }

    pub fn tokens(address: &str) -> String {
        format!("tokens:{}", address)
    }

    pub fn nfts(address: &str) -> String {
        format!("nfts:{}", address)
    }
}

/// A value and whether it was served from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub value: T,
    pub from_cache: bool,
}

/// TTL cache over a [`KeyValueStore`] with per-key single-flight.
///
/// While a computation for a key is running, later callers for the same key
/// await that computation instead of starting their own. The in-flight table
/// lives only in this process.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
    in_flight: Arc<DashMap<String, InFlight>>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `compute` and cache its result for `ttl`.
    ///
    /// A failed computation is handed to every caller waiting on it and is not cached.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached<T>, WalletError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WalletError>> + Send + 'static,
    {
        if let Some(raw) = self.store.get(key).await? {
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    return Ok(Cached {
                        value,
                        from_cache: true,
                    });
                }
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let task = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!("Joining in-flight fetch for {}", key);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                debug!("Cache miss for {}", key);
                let task = self.fill(key.to_string(), ttl, compute()).boxed().shared();
                entry.insert(task.clone());
                task
            }
        };

        let outcome = task.clone().await;
        self.in_flight
            .remove_if(key, |_, running| running.ptr_eq(&task));

        let raw = outcome?;
        Ok(Cached {
            value: serde_json::from_str(&raw)?,
            from_cache: false,
        })
    }

    /// Number of computations currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn fill<T, Fut>(
        &self,
        key: String,
        ttl: Duration,
        computation: Fut,
    ) -> impl Future<Output = Result<String, WalletError>> + Send + 'static
    where
        T: Serialize + Send + 'static,
        Fut: Future<Output = Result<T, WalletError>> + Send + 'static,
    {
        let store = self.store.clone();
        async move {
            let value = computation.await?;
            let raw = serde_json::to_string(&value)?;

            // A failed write only costs a recomputation later
            if let Err(e) = store.set_ex(&key, &raw, ttl).await {
                warn!("Failed to cache {}: {}", key, e);
            }
            Ok(raw)
        }
    }
}
