// Storage backends and the repositories built on them
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod repositories;
pub mod store;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use mongodb::{MongoDbClient, MongoStore};
pub use store::KeyValueStore;
