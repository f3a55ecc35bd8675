use agora_types::{AccountAddress, Amount, RequestId, RoundId};
use thiserror::Error;

/// Raffle operation result type
pub type Result<T> = std::result::Result<T, RaffleError>;

/// Raffle errors
#[derive(Debug, Error)]
pub enum RaffleError {
    #[error("Caller {caller} is not the raffle owner")]
    NotOwner { caller: AccountAddress },

    #[error("Raffle setup is not complete")]
    SetupIncomplete,

    #[error("Raffle setup already completed")]
    SetupAlreadyDone,

    #[error("Unknown round: {0}")]
    UnknownRound(RoundId),

    #[error("Round {0} is not active")]
    RoundInactive(RoundId),

    #[error("Round {0} has ended")]
    RoundEnded(RoundId),

    #[error("Round {0} has not ended yet")]
    RoundNotEnded(RoundId),

    #[error("Account {account} already entered round {round}")]
    AlreadyEntered {
        round: RoundId,
        account: AccountAddress,
    },

    #[error("Wrong ticket price: expected {expected}, attached {attached}")]
    WrongTicketPrice { expected: Amount, attached: Amount },

    #[error("Round {0} prize already distributed")]
    AlreadyDistributed(RoundId),

    #[error("Round {0} has a randomness draw pending")]
    DrawPending(RoundId),

    #[error("No round awaits randomness request {0}")]
    UnknownRequest(RequestId),

    #[error("Caller {caller} is not the randomness oracle dispatcher")]
    UnauthorizedOracle { caller: AccountAddress },

    #[error("Randomness payload does not decode to an unsigned integer")]
    MalformedRandomness,

    #[error("Randomness request failed: {0}")]
    RandomnessRequestFailed(String),

    #[error("Payout to {to} failed: {reason}")]
    TransferFailed { to: AccountAddress, reason: String },

    #[error("Treasury error: {0}")]
    Treasury(#[from] agora_treasury::TreasuryError),
}
