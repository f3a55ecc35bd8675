pub mod error;
pub mod storage;
pub mod transfer;
pub mod vault;

pub use error::{Result, TreasuryError};
pub use storage::{LedgerDirection, LedgerEntry, MemoryStorage, TreasuryStorage};
pub use transfer::{FundsTransfer, RecordingTransfer, TransferEvent, TransferReason};
pub use vault::{StrategyLookup, Vault};
