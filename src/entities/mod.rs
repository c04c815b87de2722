pub mod inventory_item;
pub mod ledger_entry;
