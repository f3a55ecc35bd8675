use agora_types::{AccountAddress, Amount};
use thiserror::Error;

/// Treasury operation result type
pub type Result<T> = std::result::Result<T, TreasuryError>;

/// Vault errors
#[derive(Debug, Error)]
pub enum TreasuryError {
    #[error("Caller {caller} is not the portal")]
    NotPortal { caller: AccountAddress },

    #[error("Attached value {attached} does not match declared amount {expected}")]
    AttachedValueMismatch { expected: Amount, attached: Amount },

    #[error("Insufficient vault funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Amount,
        requested: Amount,
    },

    #[error("Caller {caller} is not a whitelisted strategy")]
    NotWhitelisted { caller: AccountAddress },

    #[error("Strategy whitelist lookup has not been registered")]
    WhitelistNotRegistered,

    #[error("Strategy whitelist lookup already registered")]
    WhitelistAlreadyRegistered,

    #[error("Asset balance overflow")]
    BalanceOverflow,

    #[error("Outbound transfer to {to} failed: {reason}")]
    TransferFailed { to: AccountAddress, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
