use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::WalletError;

/// Key-value storage with strings, hashes and capped lists.
///
/// Values are opaque strings (JSON documents in practice). Implementations
/// must be safe to share between tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, WalletError>;

    /// Store `value` without expiry
    async fn set(&self, key: &str, value: &str) -> Result<(), WalletError>;

    /// Store `value`; it is no longer visible once `ttl` has elapsed
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WalletError>;

    async fn del(&self, key: &str) -> Result<(), WalletError>;

    async fn hset(&self, hash: &str, field: &str, value: &str) -> Result<(), WalletError>;

    async fn hget(&self, hash: &str, field: &str) -> Result<Option<String>, WalletError>;

    async fn hgetall(&self, hash: &str) -> Result<HashMap<String, String>, WalletError>;

    /// Remove `field`; returns whether it existed
    async fn hdel(&self, hash: &str, field: &str) -> Result<bool, WalletError>;

    /// Prepend `value` to the list and keep only the first `cap` items, as one atomic step
    async fn lpush_trim(&self, key: &str, value: &str, cap: usize) -> Result<(), WalletError>;

    /// Items `start..=stop`; negative indices count from the end (`-1` is the last item)
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, WalletError>;
}

/// Resolve a Redis-style inclusive range against a list of `len` items
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}
