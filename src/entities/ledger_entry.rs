use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{EntryKind, LedgerEntry};

/// Stored direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum LedgerEntryKind {
    #[sea_orm(string_value = "replenishment")]
    Replenishment,
    #[sea_orm(string_value = "consumption")]
    Consumption,
}

impl From<EntryKind> for LedgerEntryKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Replenishment => LedgerEntryKind::Replenishment,
            EntryKind::Consumption => LedgerEntryKind::Consumption,
        }
    }
}

impl From<LedgerEntryKind> for EntryKind {
    fn from(kind: LedgerEntryKind) -> Self {
        match kind {
            LedgerEntryKind::Replenishment => EntryKind::Replenishment,
            LedgerEntryKind::Consumption => EntryKind::Consumption,
        }
    }
}

/// One row per stock change; `(item_id, sequence)` is unique
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub sequence: i64,
    /// Caller-supplied date and time of the transaction
    pub occurred_at: NaiveDateTime,
    pub quantity_after: i64,
    pub amount: i64,
    pub kind: LedgerEntryKind,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for LedgerEntry {
    fn from(model: Model) -> Self {
        LedgerEntry {
            id: model.id,
            item_id: model.item_id,
            sequence: model.sequence,
            timestamp: model.occurred_at.into(),
            quantity_after: model.quantity_after,
            amount: model.amount,
            kind: model.kind.into(),
            recorded_at: model.recorded_at,
        }
    }
}
