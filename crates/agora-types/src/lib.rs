pub mod address;
pub mod amount;

pub use address::AccountAddress;
pub use amount::Amount;

/// Monotonic 1-indexed proposal identifier.
pub type ProposalId = u64;

/// Monotonic 1-indexed raffle round identifier.
pub type RoundId = u64;

/// Monotonic 1-indexed collectible token identifier.
pub type TokenId = u64;

/// Opaque identifier correlating a randomness request with its fulfillment.
pub type RequestId = u64;
