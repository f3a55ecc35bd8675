use crate::types::ProposalState;
use agora_types::Amount;
use tracing::info;

/// Swappable verdict logic behind the governance core.
///
/// The core keeps durable proposal/whitelist storage; only the verdict
/// dispatch is indirected through this trait. An `Upgrade` execution
/// re-points the core's current implementation and calls `initialize`,
/// leaving storage in place — code swaps, storage does not.
pub trait VerdictLogic: Send + Sync {
    /// Implementation version, for logs and the query surface.
    fn version(&self) -> u32;

    /// Hook invoked when this implementation becomes current.
    fn initialize(&self) {}

    /// Decide a finished vote. Must return `Succeeded` or `Defeated`.
    fn verdict(&self, for_votes: Amount, against_votes: Amount) -> ProposalState;
}

/// Default verdict: strictly more support than opposition succeeds.
pub struct SimpleMajority;

impl VerdictLogic for SimpleMajority {
    fn version(&self) -> u32 {
        1
    }

    fn initialize(&self) {
        info!(version = 1, "⚙️ Simple-majority verdict logic initialized");
    }

    fn verdict(&self, for_votes: Amount, against_votes: Amount) -> ProposalState {
        if for_votes > against_votes {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_majority_verdict() {
        let logic = SimpleMajority;
        assert_eq!(
            logic.verdict(Amount::from_units(20), Amount::from_units(10)),
            ProposalState::Succeeded
        );
        assert_eq!(
            logic.verdict(Amount::from_units(10), Amount::from_units(10)),
            ProposalState::Defeated
        );
        assert_eq!(
            logic.verdict(Amount::ZERO, Amount::ZERO),
            ProposalState::Defeated
        );
    }
}
