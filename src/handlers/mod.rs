pub mod inventory_entries;
pub mod inventory_items;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{EntryKind, LedgerEntry};

/// Wire form of a ledger entry used by every inventory endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[schema(example = "2024-06-01")]
    pub date: String,
    #[schema(example = "14:30:00")]
    pub time: String,
    /// Quantity on hand after this entry
    pub quantity: i64,
    /// Units consumed; 0 for replenishments
    pub spent: i64,
    pub is_base: bool,
}

impl From<&LedgerEntry> for HistoryEntry {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            date: entry.timestamp.date_string(),
            time: entry.timestamp.time_string(),
            quantity: entry.quantity_after,
            spent: match entry.kind {
                EntryKind::Replenishment => 0,
                EntryKind::Consumption => entry.amount,
            },
            is_base: entry.kind.is_base(),
        }
    }
}
