use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::{stale_append, stale_tail, LedgerRepository};
use crate::entities::{inventory_item, ledger_entry};
use crate::errors::ServiceError;
use crate::models::{Item, ItemId, LedgerEntry, NewLedgerEntry, TailCorrection};

/// sea-orm backed store (sqlite or postgres).
#[derive(Debug, Clone)]
pub struct DatabaseLedgerRepository {
    db: Arc<DatabaseConnection>,
}

impl DatabaseLedgerRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn unwrap_txn(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

async fn tail_in(
    txn: &DatabaseTransaction,
    item_id: ItemId,
) -> Result<Option<ledger_entry::Model>, ServiceError> {
    ledger_entry::Entity::find()
        .filter(ledger_entry::Column::ItemId.eq(item_id))
        .order_by_desc(ledger_entry::Column::Sequence)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)
}

async fn ensure_item_in(txn: &DatabaseTransaction, item_id: ItemId) -> Result<(), ServiceError> {
    inventory_item::Entity::find_by_id(item_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::item_not_found(item_id))
}

#[async_trait]
impl LedgerRepository for DatabaseLedgerRepository {
    fn backend_name(&self) -> &'static str {
        "database"
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        crate::db::check_connection(&self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn insert_item(&self, name: String) -> Result<Item, ServiceError> {
        let db = &*self.db;
        db.transaction::<_, Item, ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = inventory_item::Entity::find()
                    .count(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                let model = inventory_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name),
                    position: Set(existing as i64 + 1),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;

                Ok(model.into())
            })
        })
        .await
        .map_err(unwrap_txn)
    }

    async fn list_items(&self) -> Result<Vec<Item>, ServiceError> {
        let models = inventory_item::Entity::find()
            .order_by_asc(inventory_item::Column::Position)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(models.into_iter().map(Item::from).collect())
    }

    async fn find_item(&self, item_id: ItemId) -> Result<Option<Item>, ServiceError> {
        let model = inventory_item::Entity::find_by_id(item_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(model.map(Item::from))
    }

    async fn find_item_by_name(&self, name: &str) -> Result<Option<Item>, ServiceError> {
        let model = inventory_item::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(inventory_item::Column::Name)))
                    .eq(name.to_lowercase()),
            )
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(model.map(Item::from))
    }

    async fn entries(&self, item_id: ItemId) -> Result<Vec<LedgerEntry>, ServiceError> {
        let models = ledger_entry::Entity::find()
            .filter(ledger_entry::Column::ItemId.eq(item_id))
            .order_by_asc(ledger_entry::Column::Sequence)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(models.into_iter().map(LedgerEntry::from).collect())
    }

    async fn tail_entry(&self, item_id: ItemId) -> Result<Option<LedgerEntry>, ServiceError> {
        let model = ledger_entry::Entity::find()
            .filter(ledger_entry::Column::ItemId.eq(item_id))
            .order_by_desc(ledger_entry::Column::Sequence)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(model.map(LedgerEntry::from))
    }

    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, ServiceError> {
        let db = &*self.db;
        db.transaction::<_, LedgerEntry, ServiceError>(move |txn| {
            Box::pin(async move {
                ensure_item_in(txn, entry.item_id).await?;

                let expected = tail_in(txn, entry.item_id)
                    .await?
                    .map(|tail| tail.sequence + 1)
                    .unwrap_or(1);
                if entry.sequence != expected {
                    return Err(stale_append(entry.item_id, expected, entry.sequence));
                }

                let item_id = entry.item_id;
                let sequence = entry.sequence;
                let model = ledger_entry::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    item_id: Set(entry.item_id),
                    sequence: Set(entry.sequence),
                    occurred_at: Set(entry.timestamp.as_naive()),
                    quantity_after: Set(entry.quantity_after),
                    amount: Set(entry.amount),
                    kind: Set(entry.kind.into()),
                    recorded_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(|e| match e.sql_err() {
                    // Lost a race with a writer in another process
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        warn!(%item_id, sequence, "Concurrent append detected");
                        stale_append(item_id, sequence + 1, sequence)
                    }
                    _ => ServiceError::db_error(e),
                })?;

                Ok(model.into())
            })
        })
        .await
        .map_err(unwrap_txn)
    }

    async fn replace_tail_entry(
        &self,
        item_id: ItemId,
        correction: TailCorrection,
    ) -> Result<LedgerEntry, ServiceError> {
        let db = &*self.db;
        db.transaction::<_, LedgerEntry, ServiceError>(move |txn| {
            Box::pin(async move {
                ensure_item_in(txn, item_id).await?;

                let tail = tail_in(txn, item_id)
                    .await?
                    .filter(|tail| tail.id == correction.entry_id)
                    .ok_or_else(|| stale_tail(item_id))?;

                let mut active: ledger_entry::ActiveModel = tail.into();
                active.amount = Set(correction.amount);
                active.quantity_after = Set(correction.quantity_after);
                active.recorded_at = Set(Utc::now());

                let updated = active
                    .update(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                Ok(updated.into())
            })
        })
        .await
        .map_err(unwrap_txn)
    }
}
