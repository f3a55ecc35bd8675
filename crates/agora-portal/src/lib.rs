pub mod error;
pub mod portal;
pub mod pricing;

pub use error::{PortalError, Result};
pub use portal::{CoreStrategyLookup, Portal, PortalConfig};
