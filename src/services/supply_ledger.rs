use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::projection::{self, Projection};
use crate::config::LedgerConfig;
use crate::errors::ServiceError;
use crate::events::{EventSender, LedgerEvent};
use crate::models::{
    EntryKind, EntryTimestamp, Item, ItemId, LedgerEntry, NewLedgerEntry, TailCorrection,
};
use crate::repositories::LedgerRepository;

/// Entry as submitted by the inventory page: a new running total for
/// replenishments, a spent amount for consumptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntryCommand {
    pub item_id: ItemId,
    pub is_base: bool,
    pub quantity: Option<i64>,
    pub spent: Option<i64>,
    pub timestamp: EntryTimestamp,
}

/// Item registry, ledger store and tail corrector over a [`LedgerRepository`].
///
/// Every mutation of an item runs under that item's lock, so the
/// read-tail / write-entry sequence cannot interleave with another writer
/// in this process.
pub struct SupplyLedgerService {
    repository: Arc<dyn LedgerRepository>,
    event_sender: EventSender,
    settings: LedgerConfig,
    item_locks: DashMap<ItemId, Arc<Mutex<()>>>,
    registry_lock: Mutex<()>,
}

fn require_positive(what: &str, amount: i64) -> Result<(), ServiceError> {
    if amount <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "{} must be a positive integer, got {}",
            what, amount
        )));
    }
    Ok(())
}

fn insufficient(requested: i64, available: i64) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "cannot consume {} units, only {} on hand",
        requested, available
    ))
}

impl SupplyLedgerService {
    pub fn new(
        repository: Arc<dyn LedgerRepository>,
        event_sender: EventSender,
        settings: LedgerConfig,
    ) -> Self {
        Self {
            repository,
            event_sender,
            settings,
            item_locks: DashMap::new(),
            registry_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn LedgerRepository> {
        &self.repository
    }

    /// Callers resolve the item first, so the map only holds locks of stored items.
    fn item_lock(&self, item_id: ItemId) -> Arc<Mutex<()>> {
        self.item_locks.entry(item_id).or_default().clone()
    }

    /// Registers a new item under a trimmed `name`.
    #[instrument(skip(self))]
    pub async fn create_item(&self, name: &str) -> Result<Item, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "item name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > self.settings.max_name_length {
            return Err(ServiceError::ValidationError(format!(
                "item name exceeds {} characters",
                self.settings.max_name_length
            )));
        }

        let item = if self.settings.enforce_unique_item_names {
            let _registry = self.registry_lock.lock().await;
            if self.repository.find_item_by_name(name).await?.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "an item named '{}' already exists",
                    name
                )));
            }
            self.repository.insert_item(name.to_string()).await?
        } else {
            self.repository.insert_item(name.to_string()).await?
        };

        counter!("supply_ledger.items.created", 1);
        info!(item_id = %item.id, name = %item.name, "Inventory item created");
        self.event_sender
            .notify(LedgerEvent::ItemCreated {
                item_id: item.id,
                name: item.name.clone(),
            })
            .await;

        Ok(item)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, ServiceError> {
        self.repository.list_items().await
    }

    pub async fn get_item(&self, item_id: ItemId) -> Result<Item, ServiceError> {
        self.repository
            .find_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::item_not_found(item_id))
    }

    /// Entries in replay order: timestamp, then append order.
    pub async fn get_history(&self, item_id: ItemId) -> Result<Vec<LedgerEntry>, ServiceError> {
        self.get_item(item_id).await?;
        let mut history = self.repository.entries(item_id).await?;
        history.sort_by_key(LedgerEntry::replay_key);
        Ok(history)
    }

    pub async fn projection(&self, item_id: ItemId) -> Result<Projection, ServiceError> {
        let history = self.get_history(item_id).await?;
        if let Err(violation) = projection::verify_chain(&history) {
            warn!(%item_id, %violation, "Stored ledger does not replay cleanly");
        }
        Ok(projection::project(&history))
    }

    #[instrument(skip(self))]
    pub async fn append_replenishment(
        &self,
        item_id: ItemId,
        amount: i64,
        timestamp: EntryTimestamp,
    ) -> Result<LedgerEntry, ServiceError> {
        require_positive("amount", amount)?;
        self.append_with(item_id, EntryKind::Replenishment, timestamp, |_| Ok(amount))
            .await
    }

    #[instrument(skip(self))]
    pub async fn append_consumption(
        &self,
        item_id: ItemId,
        amount: i64,
        timestamp: EntryTimestamp,
    ) -> Result<LedgerEntry, ServiceError> {
        require_positive("amount", amount)?;
        self.append_with(item_id, EntryKind::Consumption, timestamp, |_| Ok(amount))
            .await
    }

    /// Appends an entry in the page's total/spent form.
    #[instrument(skip(self))]
    pub async fn record_entry(
        &self,
        command: RecordEntryCommand,
    ) -> Result<LedgerEntry, ServiceError> {
        let RecordEntryCommand {
            item_id,
            is_base,
            quantity,
            spent,
            timestamp,
        } = command;

        if is_base {
            if spent.unwrap_or(0) != 0 {
                return Err(ServiceError::ValidationError(
                    "spent must be 0 for a base entry".to_string(),
                ));
            }
            let total = quantity.ok_or_else(|| {
                ServiceError::ValidationError("quantity is required for a base entry".to_string())
            })?;
            self.append_with(item_id, EntryKind::Replenishment, timestamp, |current| {
                let amount = total.checked_sub(current).ok_or_else(|| {
                    ServiceError::ValidationError("quantity is out of range".to_string())
                })?;
                if amount <= 0 {
                    return Err(ServiceError::ValidationError(format!(
                        "new total {} must exceed the current quantity {}",
                        total, current
                    )));
                }
                Ok(amount)
            })
            .await
        } else {
            let amount = spent.ok_or_else(|| {
                ServiceError::ValidationError("spent is required for a consumption".to_string())
            })?;
            require_positive("spent", amount)?;
            self.append_with(item_id, EntryKind::Consumption, timestamp, |current| {
                if amount > current {
                    return Err(insufficient(amount, current));
                }
                match quantity {
                    Some(total) if total != current - amount => {
                        Err(ServiceError::Conflict(format!(
                            "quantity {} does not match current quantity {} minus spent {}",
                            total, current, amount
                        )))
                    }
                    _ => Ok(amount),
                }
            })
            .await
        }
    }

    /// Shared append path; `resolve_amount` maps the current quantity to the
    /// entry amount and runs under the item lock.
    async fn append_with<F>(
        &self,
        item_id: ItemId,
        kind: EntryKind,
        timestamp: EntryTimestamp,
        resolve_amount: F,
    ) -> Result<LedgerEntry, ServiceError>
    where
        F: FnOnce(i64) -> Result<i64, ServiceError> + Send,
    {
        self.get_item(item_id).await?;
        let lock = self.item_lock(item_id);
        let guard = lock.lock().await;

        let tail = self.repository.tail_entry(item_id).await?;

        if let Some(tail) = &tail {
            if timestamp < tail.timestamp {
                return Err(ServiceError::ValidationError(format!(
                    "entry dated {} {} is earlier than the last entry ({} {})",
                    timestamp.date_string(),
                    timestamp.time_string(),
                    tail.timestamp.date_string(),
                    tail.timestamp.time_string()
                )));
            }
        }

        let previous = tail.as_ref().map_or(0, |tail| tail.quantity_after);
        let amount = resolve_amount(previous)?;
        require_positive("amount", amount)?;
        if kind == EntryKind::Consumption && amount > previous {
            counter!("supply_ledger.entries.rejected", 1, "reason" => "insufficient_stock");
            return Err(insufficient(amount, previous));
        }
        let quantity_after = kind.apply(previous, amount).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "adding {} to {} overflows the quantity range",
                amount, previous
            ))
        })?;
        if kind == EntryKind::Replenishment {
            let history = self.repository.entries(item_id).await?;
            let usage = projection::project(&history).total_usage;
            if usage.checked_add(amount).is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "adding {} to a cumulative usage of {} overflows the quantity range",
                    amount, usage
                )));
            }
        }

        let entry = self
            .repository
            .append_entry(NewLedgerEntry {
                item_id,
                sequence: tail.as_ref().map_or(1, |tail| tail.sequence + 1),
                timestamp,
                quantity_after,
                amount,
                kind,
            })
            .await?;
        drop(guard);

        counter!("supply_ledger.entries.appended", 1, "kind" => kind.to_string());
        info!(
            %item_id,
            kind = %kind,
            amount,
            quantity_after,
            sequence = entry.sequence,
            "Ledger entry appended"
        );
        self.event_sender.notify(LedgerEvent::appended(&entry)).await;

        Ok(entry)
    }

    /// Changes the amount of the item's last entry, which must be a consumption.
    #[instrument(skip(self))]
    pub async fn correct_last_consumption(
        &self,
        item_id: ItemId,
        new_amount: i64,
    ) -> Result<LedgerEntry, ServiceError> {
        self.correct_tail(item_id, None, new_amount).await
    }

    /// Index-addressed correction; only the last index of the history is accepted.
    #[instrument(skip(self))]
    pub async fn correct_entry(
        &self,
        item_id: ItemId,
        history_index: usize,
        new_amount: i64,
    ) -> Result<LedgerEntry, ServiceError> {
        self.correct_tail(item_id, Some(history_index), new_amount)
            .await
    }

    async fn correct_tail(
        &self,
        item_id: ItemId,
        history_index: Option<usize>,
        new_amount: i64,
    ) -> Result<LedgerEntry, ServiceError> {
        self.get_item(item_id).await?;
        let lock = self.item_lock(item_id);
        let guard = lock.lock().await;

        let history = self.get_history(item_id).await?;
        let (tail, earlier) = history.split_last().ok_or_else(|| {
            ServiceError::InvalidOperation(format!("item {} has no entries to correct", item_id))
        })?;

        if let Some(index) = history_index {
            if index != earlier.len() {
                return Err(ServiceError::InvalidOperation(format!(
                    "only the last entry (index {}) can be corrected, not index {}",
                    earlier.len(),
                    index
                )));
            }
        }
        if tail.kind != EntryKind::Consumption {
            return Err(ServiceError::InvalidOperation(
                "the last entry is a replenishment and cannot be corrected".to_string(),
            ));
        }
        require_positive("amount", new_amount)?;

        let prior = earlier.last().map_or(0, |entry| entry.quantity_after);
        if new_amount > prior {
            counter!("supply_ledger.corrections.rejected", 1, "reason" => "insufficient_stock");
            return Err(insufficient(new_amount, prior));
        }

        let corrected = self
            .repository
            .replace_tail_entry(
                item_id,
                TailCorrection {
                    entry_id: tail.id,
                    amount: new_amount,
                    quantity_after: prior - new_amount,
                },
            )
            .await?;
        drop(guard);

        counter!("supply_ledger.corrections.applied", 1);
        info!(
            %item_id,
            old_amount = tail.amount,
            new_amount,
            quantity_after = corrected.quantity_after,
            "Last consumption corrected"
        );
        self.event_sender
            .notify(LedgerEvent::ConsumptionCorrected {
                item_id,
                entry_id: corrected.id,
                old_amount: tail.amount,
                new_amount,
                quantity_after: corrected.quantity_after,
            })
            .await;

        Ok(corrected)
    }
}
