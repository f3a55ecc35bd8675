pub mod error;
pub mod governance_token;
pub mod share_token;

pub use error::{LedgerError, Result};
pub use governance_token::{GovernanceToken, VestingClaim, VestingConfig};
pub use share_token::ShareToken;
