use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{stale_append, stale_tail, LedgerRepository};
use crate::errors::ServiceError;
use crate::models::{Item, ItemId, LedgerEntry, NewLedgerEntry, TailCorrection};

/// In-process store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    items: RwLock<Vec<Item>>,
    ledgers: DashMap<ItemId, Vec<LedgerEntry>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn insert_item(&self, name: String) -> Result<Item, ServiceError> {
        let mut items = self.items.write().await;
        let item = Item {
            id: Uuid::new_v4(),
            name,
            position: items.len() as i64 + 1,
            created_at: Utc::now(),
        };
        self.ledgers.insert(item.id, Vec::new());
        items.push(item.clone());
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<Item>, ServiceError> {
        Ok(self.items.read().await.clone())
    }

    async fn find_item(&self, item_id: ItemId) -> Result<Option<Item>, ServiceError> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .find(|item| item.id == item_id)
            .cloned())
    }

    async fn find_item_by_name(&self, name: &str) -> Result<Option<Item>, ServiceError> {
        let wanted = name.to_lowercase();
        Ok(self
            .items
            .read()
            .await
            .iter()
            .find(|item| item.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn entries(&self, item_id: ItemId) -> Result<Vec<LedgerEntry>, ServiceError> {
        Ok(self
            .ledgers
            .get(&item_id)
            .map(|ledger| ledger.clone())
            .unwrap_or_default())
    }

    async fn tail_entry(&self, item_id: ItemId) -> Result<Option<LedgerEntry>, ServiceError> {
        Ok(self
            .ledgers
            .get(&item_id)
            .and_then(|ledger| ledger.last().cloned()))
    }

    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, ServiceError> {
        let mut ledger = self
            .ledgers
            .get_mut(&entry.item_id)
            .ok_or_else(|| ServiceError::item_not_found(entry.item_id))?;

        let expected = ledger.len() as i64 + 1;
        if entry.sequence != expected {
            return Err(stale_append(entry.item_id, expected, entry.sequence));
        }

        let stored = entry.into_entry(Uuid::new_v4(), Utc::now());
        ledger.push(stored.clone());
        Ok(stored)
    }

    async fn replace_tail_entry(
        &self,
        item_id: ItemId,
        correction: TailCorrection,
    ) -> Result<LedgerEntry, ServiceError> {
        let mut ledger = self
            .ledgers
            .get_mut(&item_id)
            .ok_or_else(|| ServiceError::item_not_found(item_id))?;

        let tail = ledger
            .last_mut()
            .filter(|tail| tail.id == correction.entry_id)
            .ok_or_else(|| stale_tail(item_id))?;

        tail.amount = correction.amount;
        tail.quantity_after = correction.quantity_after;
        tail.recorded_at = Utc::now();
        Ok(tail.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, EntryTimestamp};
    use assert_matches::assert_matches;

    fn new_entry(item_id: ItemId, sequence: i64, quantity_after: i64) -> NewLedgerEntry {
        NewLedgerEntry {
            item_id,
            sequence,
            timestamp: EntryTimestamp::parse("2024-01-01", "08:00").unwrap(),
            quantity_after,
            amount: quantity_after,
            kind: EntryKind::Replenishment,
        }
    }

    #[tokio::test]
    async fn items_keep_creation_order() {
        let repo = InMemoryLedgerRepository::new();
        repo.insert_item("Gauze".into()).await.unwrap();
        repo.insert_item("Saline".into()).await.unwrap();

        let names: Vec<_> = repo
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.position, i.name))
            .collect();
        assert_eq!(names, vec![(1, "Gauze".into()), (2, "Saline".into())]);
        assert!(repo.find_item_by_name("gAuZe").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn append_rejects_sequence_gaps() {
        let repo = InMemoryLedgerRepository::new();
        let item = repo.insert_item("Gauze".into()).await.unwrap();

        repo.append_entry(new_entry(item.id, 1, 10)).await.unwrap();
        let err = repo.append_entry(new_entry(item.id, 3, 20)).await.unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
        assert_eq!(repo.entries(item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_only_touches_current_tail() {
        let repo = InMemoryLedgerRepository::new();
        let item = repo.insert_item("Gauze".into()).await.unwrap();
        let first = repo.append_entry(new_entry(item.id, 1, 10)).await.unwrap();
        repo.append_entry(new_entry(item.id, 2, 20)).await.unwrap();

        let err = repo
            .replace_tail_entry(
                item.id,
                TailCorrection {
                    entry_id: first.id,
                    amount: 1,
                    quantity_after: 1,
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
        assert_eq!(repo.entries(item.id).await.unwrap()[0], first);
    }

    #[tokio::test]
    async fn append_to_unknown_item_is_not_found() {
        let repo = InMemoryLedgerRepository::new();
        let err = repo
            .append_entry(new_entry(Uuid::new_v4(), 1, 5))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }
}
