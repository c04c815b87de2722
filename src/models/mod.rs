pub mod ledger;

pub use ledger::{
    EntryKind, EntryTimestamp, Item, ItemId, LedgerEntry, NewLedgerEntry, TailCorrection,
};
