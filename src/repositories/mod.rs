//! Storage for items and their ledgers.
//!
//! Two backends share the [`LedgerRepository`] contract: an in-process
//! store for development and tests, and a sea-orm store for sqlite or
//! postgres. The repository enforces append-only storage: new entries must
//! claim the next sequence number and only the current tail may be replaced.
//! Business rules (stock checks, correction eligibility) live in the ledger
//! service, which serializes writers per item before calling in here.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::models::{Item, ItemId, LedgerEntry, NewLedgerEntry, TailCorrection};

pub mod database;
pub mod memory;

pub use database::DatabaseLedgerRepository;
pub use memory::InMemoryLedgerRepository;

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Short identifier reported by health checks.
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), ServiceError>;

    /// Stores a new item at the end of the registry.
    async fn insert_item(&self, name: String) -> Result<Item, ServiceError>;

    /// All items in creation order.
    async fn list_items(&self) -> Result<Vec<Item>, ServiceError>;

    async fn find_item(&self, item_id: ItemId) -> Result<Option<Item>, ServiceError>;

    /// Case-insensitive lookup by exact (trimmed) name.
    async fn find_item_by_name(&self, name: &str) -> Result<Option<Item>, ServiceError>;

    /// Entries of an item in append order (ascending sequence).
    async fn entries(&self, item_id: ItemId) -> Result<Vec<LedgerEntry>, ServiceError>;

    async fn tail_entry(&self, item_id: ItemId) -> Result<Option<LedgerEntry>, ServiceError>;

    /// Persists `entry`; fails with `Conflict` unless `entry.sequence` is
    /// exactly one past the current tail.
    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, ServiceError>;

    /// Rewrites amount and quantity of the tail entry; fails with
    /// `Conflict` if `correction.entry_id` is no longer the tail.
    async fn replace_tail_entry(
        &self,
        item_id: ItemId,
        correction: TailCorrection,
    ) -> Result<LedgerEntry, ServiceError>;
}

pub(crate) fn stale_append(item_id: ItemId, expected: i64, got: i64) -> ServiceError {
    ServiceError::Conflict(format!(
        "ledger of item {} moved on: expected sequence {}, got {}",
        item_id, expected, got
    ))
}

pub(crate) fn stale_tail(item_id: ItemId) -> ServiceError {
    ServiceError::Conflict(format!(
        "entry is no longer the last entry of item {}",
        item_id
    ))
}

/// Builds the repository selected by `storage_backend`.
pub fn create_repository(
    config: &AppConfig,
    db: Option<Arc<DbPool>>,
) -> Result<Arc<dyn LedgerRepository>, ServiceError> {
    if !config.uses_database() {
        return Ok(Arc::new(InMemoryLedgerRepository::new()));
    }
    match db {
        Some(db) => Ok(Arc::new(DatabaseLedgerRepository::new(db))),
        None => Err(ServiceError::InternalError(
            "database backend selected but no connection was provided".to_string(),
        )),
    }
}
