pub mod projection;
pub mod supply_ledger;

pub use projection::{group_runs, project, verify_chain, BaseRun, ChainViolation, Projection};
pub use supply_ledger::{RecordEntryCommand, SupplyLedgerService};
