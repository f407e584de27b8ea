use crate::database::models::BalanceAlert;
use crate::database::store::KeyValueStore;
use crate::errors::WalletError;
use log::{info, warn};
use std::sync::Arc;

const ALERTS_KEY: &str = "wallet:alerts";

/// Bounded alert history, newest first
#[derive(Clone)]
pub struct AlertRepository {
    store: Arc<dyn KeyValueStore>,
    cap: usize,
}

impl AlertRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
        }
    }

    /// Prepend `alert` and drop everything past the cap
    pub async fn append(&self, alert: &BalanceAlert) -> Result<(), WalletError> {
        let value = serde_json::to_string(alert)?;
        self.store.lpush_trim(ALERTS_KEY, &value, self.cap).await?;
        info!(
            "Balance alert for {}: {} -> {} {}",
            alert.address, alert.previous_balance, alert.current_balance, alert.symbol
        );
        Ok(())
    }

    /// The stored history, newest first
    pub async fn list(&self) -> Result<Vec<BalanceAlert>, WalletError> {
        let items = self.store.lrange(ALERTS_KEY, 0, -1).await?;
        Ok(items
            .iter()
            .filter_map(|item| match serde_json::from_str(item) {
                Ok(alert) => Some(alert),
                Err(e) => {
                    warn!("Skipping malformed alert entry: {}", e);
                    None
                }
            })
            .collect())
    }
}
