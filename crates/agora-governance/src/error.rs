use agora_types::{AccountAddress, ProposalId};
use thiserror::Error;

/// Governance operation result type
pub type Result<T> = std::result::Result<T, GovernanceError>;

/// Governance errors
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Caller {caller} is not the governance owner")]
    NotOwner { caller: AccountAddress },

    #[error("Invalid proposal id: {0}")]
    InvalidProposalId(ProposalId),

    #[error("Proposal {0} was defeated")]
    ProposalDefeated(ProposalId),

    #[error("Proposal {0} is still in its voting window")]
    ProposalActive(ProposalId),

    #[error("Proposal {0} is not executable")]
    ProposalNotExecutable(ProposalId),

    #[error("Strategy {0} is already whitelisted")]
    StrategyAlreadyWhitelisted(AccountAddress),

    #[error("Strategy {0} is not whitelisted")]
    StrategyNotWhitelisted(AccountAddress),

    #[error("No verdict logic installed at {0}")]
    LogicNotInstalled(AccountAddress),

    #[error("Verdict logic already installed at {0}")]
    LogicAlreadyInstalled(AccountAddress),
}
