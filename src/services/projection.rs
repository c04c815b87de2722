//! Read-side derivations over an item's history.
//!
//! Everything here is a pure function of the entry list handed in; callers
//! pass the output of `SupplyLedgerService::get_history`.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{EntryKind, LedgerEntry};

/// Totals derived by replaying a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Projection {
    pub current_quantity: i64,
    /// Cumulative replenishment volume. Consumption is not counted.
    pub total_usage: i64,
    pub entry_count: usize,
}

pub fn project(history: &[LedgerEntry]) -> Projection {
    Projection {
        current_quantity: history.last().map_or(0, |entry| entry.quantity_after),
        total_usage: history
            .iter()
            .filter(|entry| entry.kind == EntryKind::Replenishment)
            .fold(0_i64, |total, entry| total.saturating_add(entry.amount)),
        entry_count: history.len(),
    }
}

/// A replenishment and the consumptions recorded after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRun<'a> {
    /// `None` only for consumptions that precede every replenishment.
    pub base: Option<&'a LedgerEntry>,
    pub consumptions: Vec<&'a LedgerEntry>,
}

pub fn group_runs(history: &[LedgerEntry]) -> Vec<BaseRun<'_>> {
    let mut runs: Vec<BaseRun<'_>> = Vec::new();
    for entry in history {
        match entry.kind {
            EntryKind::Replenishment => runs.push(BaseRun {
                base: Some(entry),
                consumptions: Vec::new(),
            }),
            EntryKind::Consumption => match runs.last_mut() {
                Some(run) => run.consumptions.push(entry),
                None => runs.push(BaseRun {
                    base: None,
                    consumptions: vec![entry],
                }),
            },
        }
    }
    runs
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("entry {entry_id} at index {index} stores quantity {stored}, replay gives {expected}")]
    QuantityMismatch {
        index: usize,
        entry_id: Uuid,
        stored: i64,
        expected: i64,
    },
    #[error("entry {entry_id} at index {index} has negative quantity {stored}")]
    NegativeQuantity {
        index: usize,
        entry_id: Uuid,
        stored: i64,
    },
    #[error("entry {entry_id} at index {index} has non-positive amount {amount}")]
    NonPositiveAmount {
        index: usize,
        entry_id: Uuid,
        amount: i64,
    },
}

/// Replays `history` from zero and reports the first inconsistent entry.
pub fn verify_chain(history: &[LedgerEntry]) -> Result<(), ChainViolation> {
    let mut running: i64 = 0;
    for (index, entry) in history.iter().enumerate() {
        if entry.amount <= 0 {
            return Err(ChainViolation::NonPositiveAmount {
                index,
                entry_id: entry.id,
                amount: entry.amount,
            });
        }
        if entry.quantity_after < 0 {
            return Err(ChainViolation::NegativeQuantity {
                index,
                entry_id: entry.id,
                stored: entry.quantity_after,
            });
        }
        let expected = running.saturating_add(entry.signed_amount());
        if entry.quantity_after != expected {
            return Err(ChainViolation::QuantityMismatch {
                index,
                entry_id: entry.id,
                stored: entry.quantity_after,
                expected,
            });
        }
        running = expected;
    }
    Ok(())
}
