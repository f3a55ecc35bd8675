use agora_types::{AccountAddress, Amount};
use thiserror::Error;

/// Portal operation result type
pub type Result<T> = std::result::Result<T, PortalError>;

/// Portal errors
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Deposit {amount} below minimum {minimum}")]
    BelowMinimumDeposit { minimum: Amount, amount: Amount },

    #[error("Withdrawal {amount} below minimum {minimum}")]
    BelowMinimumWithdraw { minimum: Amount, amount: Amount },

    #[error("Deposit {amount} converts to zero shares at price {price}")]
    DepositTooSmall { amount: Amount, price: u64 },

    #[error("Withdrawal {amount} converts to zero shares at price {price}")]
    WithdrawTooSmall { amount: Amount, price: u64 },

    #[error("Insufficient shares for {account}: has {has}, needs {needs}")]
    InsufficientShares {
        account: AccountAddress,
        has: Amount,
        needs: Amount,
    },

    #[error("Account {0} has no governance-token entitlement")]
    ZeroEntitlement(AccountAddress),

    #[error("Account {0} has nothing to claim")]
    NothingToClaim(AccountAddress),

    #[error("Insufficient governance tokens to propose: required {required}, actual {actual}")]
    InsufficientGovernanceTokens { required: Amount, actual: Amount },

    #[error("Ledger error: {0}")]
    Ledger(#[from] agora_ledger::LedgerError),

    #[error("Treasury error: {0}")]
    Treasury(#[from] agora_treasury::TreasuryError),

    #[error("Governance error: {0}")]
    Governance(#[from] agora_governance::GovernanceError),
}
