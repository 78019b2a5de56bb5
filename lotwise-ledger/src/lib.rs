pub mod holds;
pub mod ledger;

pub use holds::HoldManager;
pub use ledger::{Claimant, HolderRef, LedgerError, SpotLedger};
