use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{EntryKind, LedgerEntry};

/// Notifications emitted after a ledger write commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    ItemCreated {
        item_id: Uuid,
        name: String,
    },
    StockReplenished {
        item_id: Uuid,
        entry_id: Uuid,
        amount: i64,
        quantity_after: i64,
    },
    StockConsumed {
        item_id: Uuid,
        entry_id: Uuid,
        amount: i64,
        quantity_after: i64,
    },
    ConsumptionCorrected {
        item_id: Uuid,
        entry_id: Uuid,
        old_amount: i64,
        new_amount: i64,
        quantity_after: i64,
    },
}

impl LedgerEvent {
    pub fn appended(entry: &LedgerEntry) -> Self {
        match entry.kind {
            EntryKind::Replenishment => LedgerEvent::StockReplenished {
                item_id: entry.item_id,
                entry_id: entry.id,
                amount: entry.amount,
                quantity_after: entry.quantity_after,
            },
            EntryKind::Consumption => LedgerEvent::StockConsumed {
                item_id: entry.item_id,
                entry_id: entry.id,
                amount: entry.amount,
                quantity_after: entry.quantity_after,
            },
        }
    }

    pub fn item_id(&self) -> Uuid {
        match self {
            LedgerEvent::ItemCreated { item_id, .. }
            | LedgerEvent::StockReplenished { item_id, .. }
            | LedgerEvent::StockConsumed { item_id, .. }
            | LedgerEvent::ConsumptionCorrected { item_id, .. } => *item_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<LedgerEvent>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<LedgerEvent>) -> Self {
        Self { sender }
    }

    /// Bounded channel pair sized by `event_channel_capacity`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LedgerEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: LedgerEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends without failing the caller; a closed channel is only logged.
    pub async fn notify(&self, event: LedgerEvent) {
        let item_id = event.item_id();
        if let Err(e) = self.send(event).await {
            warn!(%item_id, error = %e, "Ledger event dropped");
        }
    }
}

/// Drains the event channel until every sender is gone.
pub async fn process_events(mut rx: mpsc::Receiver<LedgerEvent>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            LedgerEvent::ItemCreated { item_id, name } => {
                info!(%item_id, name = %name, "Inventory item created");
            }
            LedgerEvent::StockReplenished {
                item_id,
                amount,
                quantity_after,
                ..
            } => {
                info!(%item_id, amount, quantity_after, "Stock replenished");
            }
            LedgerEvent::StockConsumed {
                item_id,
                amount,
                quantity_after,
                ..
            } => {
                info!(%item_id, amount, quantity_after, "Stock consumed");
            }
            LedgerEvent::ConsumptionCorrected {
                item_id,
                old_amount,
                new_amount,
                quantity_after,
                ..
            } => {
                info!(
                    %item_id,
                    old_amount,
                    new_amount,
                    quantity_after,
                    "Consumption corrected"
                );
            }
        }
        debug!(?event, "Event processed");
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_survives_closed_channel() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        sender
            .notify(LedgerEvent::ItemCreated {
                item_id: Uuid::new_v4(),
                name: "Gauze".into(),
            })
            .await;
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (sender, mut rx) = EventSender::channel(4);
        let item_id = Uuid::new_v4();
        sender
            .notify(LedgerEvent::ItemCreated {
                item_id,
                name: "Saline".into(),
            })
            .await;
        sender
            .notify(LedgerEvent::StockReplenished {
                item_id,
                entry_id: Uuid::new_v4(),
                amount: 5,
                quantity_after: 5,
            })
            .await;

        assert!(matches!(rx.recv().await, Some(LedgerEvent::ItemCreated { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(LedgerEvent::StockReplenished { amount: 5, .. })
        ));
    }
}
