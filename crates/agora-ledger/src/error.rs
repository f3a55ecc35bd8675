use agora_types::AccountAddress;
use thiserror::Error;

/// Ledger operation result type
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Token ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Caller {caller} is not the ledger owner")]
    NotOwner { caller: AccountAddress },

    #[error("Insufficient balance for {account}: has {has}, needs {needs}")]
    InsufficientBalance {
        account: AccountAddress,
        has: agora_types::Amount,
        needs: agora_types::Amount,
    },

    #[error("Balance overflow for {0}")]
    BalanceOverflow(AccountAddress),
}
