use crate::config::MongoDbConfig;
use crate::errors::WalletError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use futures::TryStreamExt;
use log::{debug, error, info};
use mongodb::{
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database as MongoDatabase, IndexModel,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::store::{resolve_range, KeyValueStore};

const KV_COLLECTION: &str = "kv";
const HASH_COLLECTION: &str = "hash_entries";
const LIST_COLLECTION: &str = "lists";

/// MongoDB client wrapper for managing database connections and operations
#[derive(Debug, Clone)]
pub struct MongoDbClient {
    _client: Client,
    database: MongoDatabase,
}

impl MongoDbClient {
    /// Initialize the MongoDB client with configuration
    pub async fn init(config: &MongoDbConfig) -> Result<Arc<Self>> {
        let connection_string = config.uri.clone();
        let database_name = config.database.clone();

        info!(
            "Connecting to MongoDB at {} with database {}",
            connection_string, database_name
        );

        let mut client_options = ClientOptions::parse(&connection_string)
            .await
            .map_err(|e| anyhow!("Failed to parse MongoDB connection string: {}", e))?;

        // Set server API version if using MongoDB Atlas
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);
        client_options.connect_timeout = Some(Duration::from_millis(config.connection_timeout_ms));
        client_options.server_selection_timeout =
            Some(Duration::from_millis(config.connection_timeout_ms));
        client_options.max_pool_size = config.max_pool_size;

        let client = Client::with_options(client_options)
            .map_err(|e| anyhow!("Failed to create MongoDB client: {}", e))?;

        let database = client.database(&database_name);

        // Test connection
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => info!(
                "Successfully connected to MongoDB database: {}",
                database_name
            ),
            Err(e) => {
                error!("Failed to connect to MongoDB: {}", e);
                return Err(anyhow!("Failed to connect to MongoDB: {}", e));
            }
        }

        let db_client = Arc::new(Self {
            _client: client,
            database,
        });

        db_client.create_indexes().await?;

        Ok(db_client)
    }

    /// Drop the whole database
    #[cfg(test)]
    async fn drop_database(&self) -> Result<()> {
        self.database
            .drop()
            .await
            .map_err(|e| anyhow!("Failed to drop database: {}", e))
    }

    /// Get a collection with the given name
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Create required indexes for all collections
    pub async fn create_indexes(&self) -> Result<()> {
        info!("Creating MongoDB indexes...");

        // Expired cache entries are removed by the server eventually;
        // reads filter them out before that happens
        let kv = self.collection::<Document>(KV_COLLECTION);
        let ttl_index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();
        kv.create_index(ttl_index)
            .await
            .map_err(|e| anyhow!("Failed to create kv expiry index: {}", e))?;

        let hashes = self.collection::<Document>(HASH_COLLECTION);
        let field_index = IndexModel::builder()
            .keys(doc! { "hash": 1, "field": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        hashes
            .create_index(field_index)
            .await
            .map_err(|e| anyhow!("Failed to create hash field index: {}", e))?;

        info!("MongoDB indexes created successfully");
        Ok(())
    }
}

/// [`KeyValueStore`] backed by MongoDB collections
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Arc<MongoDbClient>,
}

impl MongoStore {
    pub fn new(client: Arc<MongoDbClient>) -> Self {
        Self { client }
    }

    fn kv(&self) -> Collection<Document> {
        self.client.collection(KV_COLLECTION)
    }

    fn hashes(&self) -> Collection<Document> {
        self.client.collection(HASH_COLLECTION)
    }

    fn lists(&self) -> Collection<Document> {
        self.client.collection(LIST_COLLECTION)
    }
}

fn expiry_after(ttl: Duration) -> DateTime {
    DateTime::from_millis(DateTime::now().timestamp_millis() + ttl.as_millis() as i64)
}

/// Matches `key` only while it has no expiry or the expiry lies after `now`
fn live_entry_filter(key: &str, now: DateTime) -> Document {
    doc! {
        "_id": key,
        "$or": [
            { "expires_at": { "$exists": false } },
            { "expires_at": Bson::Null },
            { "expires_at": { "$gt": now } },
        ],
    }
}

fn persistent_value_update(value: &str) -> Document {
    doc! {
        "$set": { "value": value },
        "$unset": { "expires_at": "" },
    }
}

fn expiring_value_update(value: &str, expires_at: DateTime) -> Document {
    doc! {
        "$set": { "value": value, "expires_at": expires_at },
    }
}

fn hash_field_filter(hash: &str, field: &str) -> Document {
    doc! { "hash": hash, "field": field }
}

/// Prepend and trim in one server-side update, so concurrent writers never
/// overwrite each other
fn prepend_capped_update(value: &str, cap: usize) -> Document {
    doc! {
        "$push": {
            "items": {
                "$each": [value],
                "$position": 0,
                "$slice": i64::try_from(cap).unwrap_or(i64::MAX),
            }
        }
    }
}

fn string_field(document: &Document, name: &str) -> Result<String, WalletError> {
    document
        .get_str(name)
        .map(str::to_string)
        .map_err(|e| WalletError::Store(format!("malformed document, field '{}': {}", name, e)))
}

#[async_trait]
impl KeyValueStore for MongoStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WalletError> {
        match self.kv().find_one(live_entry_filter(key, DateTime::now())).await? {
            Some(document) => Ok(Some(string_field(&document, "value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WalletError> {
        self.kv()
            .update_one(doc! { "_id": key }, persistent_value_update(value))
            .upsert(true)
            .await?;
        debug!("Stored {}", key);
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), WalletError> {
        self.kv()
            .update_one(doc! { "_id": key }, expiring_value_update(value, expiry_after(ttl)))
            .upsert(true)
            .await?;
        debug!("Stored {} for {:?}", key, ttl);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), WalletError> {
        self.kv().delete_one(doc! { "_id": key }).await?;
        self.lists().delete_one(doc! { "_id": key }).await?;
        self.hashes().delete_many(doc! { "hash": key }).await?;
        Ok(())
    }

    async fn hset(&self, hash: &str, field: &str, value: &str) -> Result<(), WalletError> {
        self.hashes()
            .update_one(hash_field_filter(hash, field), doc! { "$set": { "value": value } })
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn hget(&self, hash: &str, field: &str) -> Result<Option<String>, WalletError> {
        match self.hashes().find_one(hash_field_filter(hash, field)).await? {
            Some(document) => Ok(Some(string_field(&document, "value")?)),
            None => Ok(None),
        }
    }

    async fn hgetall(&self, hash: &str) -> Result<HashMap<String, String>, WalletError> {
        let documents: Vec<Document> = self
            .hashes()
            .find(doc! { "hash": hash })
            .await?
            .try_collect()
            .await?;

        documents
            .iter()
            .map(|document| Ok((string_field(document, "field")?, string_field(document, "value")?)))
            .collect()
    }

    async fn hdel(&self, hash: &str, field: &str) -> Result<bool, WalletError> {
        let result = self.hashes().delete_one(hash_field_filter(hash, field)).await?;
        Ok(result.deleted_count > 0)
    }

    async fn lpush_trim(&self, key: &str, value: &str, cap: usize) -> Result<(), WalletError> {
        self.lists()
            .update_one(doc! { "_id": key }, prepend_capped_update(value, cap))
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, WalletError> {
        let Some(document) = self.lists().find_one(doc! { "_id": key }).await? else {
            return Ok(Vec::new());
        };

        let items = document
            .get_array("items")
            .map_err(|e| WalletError::Store(format!("malformed list '{}': {}", key, e)))?;

        let Some((from, to)) = resolve_range(items.len(), start, stop) else {
            return Ok(Vec::new());
        };

        Ok(items[from..=to]
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MongoDbConfig;

    #[test]
    fn test_live_entry_filter_excludes_expired() {
        let now = DateTime::from_millis(1_700_000_000_000);
        let filter = live_entry_filter("balance:0xabc", now);

        assert_eq!(filter.get_str("_id").unwrap(), "balance:0xabc");
        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 3);
        assert_eq!(
            branches[2],
            Bson::Document(doc! { "expires_at": { "$gt": now } })
        );
    }

    #[test]
    fn test_value_updates() {
        let update = persistent_value_update("1.5");
        assert_eq!(update.get_document("$set").unwrap(), &doc! { "value": "1.5" });
        assert!(update.get_document("$unset").unwrap().contains_key("expires_at"));

        let expires_at = DateTime::from_millis(1_700_000_030_000);
        let update = expiring_value_update("1.5", expires_at);
        assert_eq!(
            update,
            doc! { "$set": { "value": "1.5", "expires_at": expires_at } }
        );
        assert!(!update.contains_key("$unset"));
    }

    #[test]
    fn test_expiry_is_in_the_future() {
        let before = DateTime::now().timestamp_millis();
        let expires_at = expiry_after(Duration::from_secs(30)).timestamp_millis();
        assert!(expires_at >= before + 30_000);
    }

    #[test]
    fn test_prepend_capped_update_is_single_push() {
        let update = prepend_capped_update("{\"address\":\"0xabc\"}", 50);
        assert_eq!(update.keys().collect::<Vec<_>>(), vec!["$push"]);

        let items = update
            .get_document("$push")
            .unwrap()
            .get_document("items")
            .unwrap();
        assert_eq!(
            items.get_array("$each").unwrap(),
            &vec![Bson::String("{\"address\":\"0xabc\"}".to_string())]
        );
        assert_eq!(items.get_i32("$position").unwrap(), 0);
        assert_eq!(items.get_i64("$slice").unwrap(), 50);
    }

    #[test]
    fn test_hash_field_filter() {
        assert_eq!(
            hash_field_filter("watchlist", "0xabc"),
            doc! { "hash": "watchlist", "field": "0xabc" }
        );
    }

    /// Runs against a live server only when `MONGODB_URI` is set
    #[tokio::test]
    async fn test_round_trip_against_server() {
        let Ok(uri) = std::env::var("MONGODB_URI") else {
            return;
        };
        let config = MongoDbConfig {
            uri,
            database: format!("wallet_monitor_test_{}", std::process::id()),
            connection_timeout_ms: 5_000,
            max_pool_size: None,
        };
        let client = MongoDbClient::init(&config).await.unwrap();
        let store = MongoStore::new(client.clone());

        store.set("last_balance:0xabc", "2.0").await.unwrap();
        assert_eq!(store.get("last_balance:0xabc").await.unwrap().as_deref(), Some("2.0"));
        store
            .set_ex("balance:0xabc", "1.0", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("balance:0xabc").await.unwrap(), None);

        store.hset("watchlist", "0xabc", "{}").await.unwrap();
        store.hset("watchlist", "0xabc", "{\"x\":1}").await.unwrap();
        assert_eq!(store.hgetall("watchlist").await.unwrap().len(), 1);
        assert_eq!(
            store.hget("watchlist", "0xabc").await.unwrap().as_deref(),
            Some("{\"x\":1}")
        );
        assert!(store.hdel("watchlist", "0xabc").await.unwrap());
        assert!(!store.hdel("watchlist", "0xabc").await.unwrap());

        for i in 0..5 {
            store
                .lpush_trim("wallet:alerts", &i.to_string(), 3)
                .await
                .unwrap();
        }
        assert_eq!(
            store.lrange("wallet:alerts", 0, -1).await.unwrap(),
            vec!["4", "3", "2"]
        );

        client.drop_database().await.unwrap();
    }
}
