//! Domain types of the supply ledger.
//!
//! An [`Item`] owns an ordered, append-only list of [`LedgerEntry`] values.
//! Each entry records the on-hand quantity right after it was applied, so
//! the quantity of an item is always the `quantity_after` of its tail.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

pub type ItemId = Uuid;

/// A tracked supply, e.g. "Nitrile gloves (M)"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    /// Creation order, 1-based
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    /// Units added to stock (a "base" entry)
    Replenishment,
    /// Units taken out of stock
    Consumption,
}

impl EntryKind {
    pub fn is_base(self) -> bool {
        matches!(self, EntryKind::Replenishment)
    }

    /// Applies an entry of this kind to `previous`; `None` on overflow.
    pub fn apply(self, previous: i64, amount: i64) -> Option<i64> {
        match self {
            EntryKind::Replenishment => previous.checked_add(amount),
            EntryKind::Consumption => previous.checked_sub(amount),
        }
    }
}

/// Caller-supplied logical time of a transaction (date + wall-clock time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryTimestamp(NaiveDateTime);

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

impl EntryTimestamp {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self(NaiveDateTime::new(date, time))
    }

    /// Parses `YYYY-MM-DD` and `HH:MM` / `HH:MM:SS`.
    pub fn parse(date: &str, time: &str) -> Result<Self, ServiceError> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| {
            ServiceError::ValidationError(format!("date '{}' is not a YYYY-MM-DD date", date))
        })?;
        let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
            .map_err(|_| {
                ServiceError::ValidationError(format!("time '{}' is not an HH:MM[:SS] time", time))
            })?;
        Ok(Self::new(date, time))
    }

    pub fn date_string(&self) -> String {
        self.0.format(DATE_FORMAT).to_string()
    }

    pub fn time_string(&self) -> String {
        self.0.format(TIME_FORMAT).to_string()
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for EntryTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

/// One stock change against an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub item_id: ItemId,
    /// Store-assigned append position, 1-based and gapless per item
    pub sequence: i64,
    pub timestamp: EntryTimestamp,
    /// On-hand quantity immediately after this entry
    pub quantity_after: i64,
    /// Units added or consumed; always positive
    pub amount: i64,
    pub kind: EntryKind,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// `amount` signed by direction: positive for replenishment.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            EntryKind::Replenishment => self.amount,
            EntryKind::Consumption => -self.amount,
        }
    }

    /// Canonical replay order: timestamp, then append order.
    pub fn replay_key(&self) -> (EntryTimestamp, i64) {
        (self.timestamp, self.sequence)
    }
}

/// A validated entry ready to be written, computed by the ledger service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub item_id: ItemId,
    pub sequence: i64,
    pub timestamp: EntryTimestamp,
    pub quantity_after: i64,
    pub amount: i64,
    pub kind: EntryKind,
}

impl NewLedgerEntry {
    pub fn into_entry(self, id: Uuid, recorded_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            item_id: self.item_id,
            sequence: self.sequence,
            timestamp: self.timestamp,
            quantity_after: self.quantity_after,
            amount: self.amount,
            kind: self.kind,
            recorded_at,
        }
    }
}

/// Replacement values for the tail entry of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailCorrection {
    pub entry_id: Uuid,
    pub amount: i64,
    pub quantity_after: i64,
}
