use agora_types::{AccountAddress, Amount, RequestId, RoundId, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Collectible rarity, selected by weighted draw on round settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RarityTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RarityTier::Common => "Common",
            RarityTier::Rare => "Rare",
            RarityTier::Epic => "Epic",
            RarityTier::Legendary => "Legendary",
        };
        write!(f, "{}", label)
    }
}

impl RarityTier {
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => RarityTier::Rare,
            2 => RarityTier::Epic,
            3 => RarityTier::Legendary,
            _ => RarityTier::Common,
        }
    }
}

/// One raffle round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleRound {
    pub id: RoundId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_prize: Amount,
    /// Insertion order doubles as the participant index
    pub participants: Vec<AccountAddress>,
    /// Membership set for O(1) duplicate-entry checks
    pub entrants: HashSet<AccountAddress>,
    pub is_active: bool,
    pub prize_distributed: bool,
    /// Set while a randomness draw is in flight
    pub pending_request: Option<RequestId>,
}

impl RaffleRound {
    pub fn new(id: RoundId, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time,
            total_prize: Amount::ZERO,
            participants: Vec::new(),
            entrants: HashSet::new(),
            is_active: true,
            prize_distributed: false,
            pending_request: None,
        }
    }

    pub fn ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// Read model for the round query surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfo {
    pub id: RoundId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_prize: Amount,
    pub participant_count: usize,
    pub is_active: bool,
    pub prize_distributed: bool,
    pub awaiting_randomness: bool,
}

impl From<&RaffleRound> for RoundInfo {
    fn from(round: &RaffleRound) -> Self {
        Self {
            id: round.id,
            start_time: round.start_time,
            end_time: round.end_time,
            total_prize: round.total_prize,
            participant_count: round.participants.len(),
            is_active: round.is_active,
            prize_distributed: round.prize_distributed,
            awaiting_randomness: round.pending_request.is_some(),
        }
    }
}

/// A minted collectible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    pub id: TokenId,
    pub owner: AccountAddress,
    pub rarity: RarityTier,
    pub round_id: RoundId,
    /// Content-addressed metadata reference
    pub content_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_rendering() {
        assert_eq!(RarityTier::Common.to_string(), "Common");
        assert_eq!(RarityTier::Legendary.to_string(), "Legendary");
    }

    #[test]
    fn test_from_index_defaults_to_common() {
        assert_eq!(RarityTier::from_index(0), RarityTier::Common);
        assert_eq!(RarityTier::from_index(3), RarityTier::Legendary);
        assert_eq!(RarityTier::from_index(42), RarityTier::Common);
    }
}
