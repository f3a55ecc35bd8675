pub mod collectibles;
pub mod error;
pub mod module;
pub mod oracle;
pub mod types;

pub use collectibles::CollectibleRegistry;
pub use error::{RaffleError, Result};
pub use module::{RaffleConfig, RaffleModule};
pub use oracle::{decode_random_value, CountingOracle, RandomnessRequest, RandomnessSource};
pub use types::{Collectible, RaffleRound, RarityTier, RoundInfo};
