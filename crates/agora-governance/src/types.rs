use agora_types::{AccountAddress, Amount, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural effect a proposal requests on execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Insert the strategy into the whitelist
    Add,
    /// Remove the strategy from the whitelist
    Delete,
    /// Swap the core's verdict logic to the implementation registered at
    /// the proposal's strategy address
    Upgrade,
    /// Signalling proposal with no structural effect
    Other,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Add => "Add",
            ActionKind::Delete => "Delete",
            ActionKind::Upgrade => "Upgrade",
            ActionKind::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// Proposal lifecycle state
///
/// Transitions are evaluated lazily: `Active` moves to `Succeeded` or
/// `Defeated` only when an access after the voting window forces a verdict,
/// and `Executed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Active,
    Succeeded,
    Defeated,
    Executed,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProposalState::Active => "Active",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Defeated => "Defeated",
            ProposalState::Executed => "Executed",
        };
        write!(f, "{}", label)
    }
}

/// A governance proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountAddress,
    pub strategy: AccountAddress,
    pub description: String,
    pub action: ActionKind,
    pub for_votes: Amount,
    pub against_votes: Amount,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: ProposalState,
    pub executed: bool,
}

impl Proposal {
    pub fn voting_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// Read model for the query surface, enums rendered for human consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalInfo {
    pub id: ProposalId,
    pub proposer: AccountAddress,
    pub strategy: AccountAddress,
    pub description: String,
    pub action: String,
    pub state: String,
    pub for_votes: Amount,
    pub against_votes: Amount,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub executed: bool,
}

impl From<&Proposal> for ProposalInfo {
    fn from(p: &Proposal) -> Self {
        Self {
            id: p.id,
            proposer: p.proposer,
            strategy: p.strategy,
            description: p.description.clone(),
            action: p.action.to_string(),
            state: p.state.to_string(),
            for_votes: p.for_votes,
            against_votes: p.against_votes,
            start_time: p.start_time,
            end_time: p.end_time,
            executed: p.executed,
        }
    }
}
