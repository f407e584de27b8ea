use crate::database::store::KeyValueStore;
use crate::errors::WalletError;
use log::debug;
use std::sync::Arc;

/// Last observed balance per watched address, the baseline for change detection
#[derive(Clone)]
pub struct BalanceRepository {
    store: Arc<dyn KeyValueStore>,
}

fn baseline_key(address: &str) -> String {
    format!("last_balance:{}", address)
}

impl BalanceRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn last_known(&self, address: &str) -> Result<Option<String>, WalletError> {
        self.store.get(&baseline_key(address)).await
    }

    /// Overwrite the baseline; it never expires
    pub async fn record(&self, address: &str, balance: &str) -> Result<(), WalletError> {
        self.store.set(&baseline_key(address), balance).await?;
        debug!("Baseline for {} is now {}", address, balance);
        Ok(())
    }

    pub async fn clear(&self, address: &str) -> Result<(), WalletError> {
        self.store.del(&baseline_key(address)).await
    }
}
