use log::{info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use super::monitor::BalanceChangedEvent;

/// Consumes balance change events; currently reports them to the log
pub struct NotificationHandler {
    events: broadcast::Receiver<BalanceChangedEvent>,
}

impl NotificationHandler {
    pub fn new(events: broadcast::Receiver<BalanceChangedEvent>) -> Self {
        Self { events }
    }

    /// Handle events until the monitor is dropped; returns how many were handled
    pub async fn run(mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    self.notify(&event);
                    handled += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Notification handler fell behind, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        handled
    }

    fn notify(&self, event: &BalanceChangedEvent) {
        let alert = &event.alert;
        let name = match &event.label {
            Some(label) => format!("{} ({})", label, alert.address),
            None => alert.address.clone(),
        };
        info!(
            "[{}] {} balance changed: {} -> {} {}",
            alert.network, name, alert.previous_balance, alert.current_balance, alert.symbol
        );
    }
}
