use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte account identifier for users, strategies, and modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix used in log fields.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Reserved address the portal module operates under.
    pub fn portal() -> Self {
        let mut bytes = [0xFE; 32];
        bytes[0] = 0x01;
        Self(bytes)
    }

    /// Reserved address the raffle module operates under.
    pub fn raffle() -> Self {
        let mut bytes = [0xFE; 32];
        bytes[0] = 0x02;
        Self(bytes)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.short_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_short_hex() {
        let addr = AccountAddress::from_bytes([0xAB; 32]);
        assert_eq!(format!("{}", addr), "0xabababababababab");
    }

    #[test]
    fn test_reserved_addresses_distinct() {
        assert_ne!(AccountAddress::portal(), AccountAddress::raffle());
    }
}
