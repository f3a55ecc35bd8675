pub mod core;
pub mod error;
pub mod logic;
pub mod metrics;
pub mod types;
pub mod whitelist;

pub use crate::core::{GovernanceConfig, GovernanceCore};
pub use error::{GovernanceError, Result};
pub use logic::{SimpleMajority, VerdictLogic};
pub use types::{ActionKind, Proposal, ProposalInfo, ProposalState};
pub use whitelist::StrategyWhitelist;
