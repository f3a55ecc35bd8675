use crate::collectibles::CollectibleRegistry;
use crate::oracle::{decode_random_value, RandomnessRequest, RandomnessSource};
use crate::types::{RaffleRound, RarityTier, RoundInfo};
use crate::{RaffleError, Result};
use agora_treasury::{FundsTransfer, TransferReason, Vault};
use agora_types::{AccountAddress, Amount, RequestId, RoundId, TokenId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Raffle module configuration
#[derive(Debug, Clone)]
pub struct RaffleConfig {
    /// Exact value every entry must attach
    pub ticket_price: Amount,
    /// Round duration in seconds
    pub round_duration_secs: i64,
    /// Below this entrant count an ended round refunds instead of drawing
    pub min_participants: usize,
    /// Platform fee reported to the vault as profit, in basis points
    pub platform_fee_bps: u64,
    /// Rarity weights for Common/Rare/Epic/Legendary, must sum to 100
    pub rarity_weights: [u64; 4],
    /// Oracle endpoint id carried in randomness requests
    pub oracle_endpoint: u64,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            ticket_price: Amount::from_units(5),
            round_duration_secs: 24 * 3600, // 1 day
            min_participants: 2,
            platform_fee_bps: 500, // 5%
            rarity_weights: [60, 25, 10, 5],
            oracle_endpoint: 1,
        }
    }
}

/// Raffle strategy module.
///
/// Rounds advance sequentially: at most one round is open, and a round
/// settles exactly once, either through a randomness-driven winner draw or
/// through a refund. The draw is a two-phase protocol — `draw_winner`
/// issues an asynchronous oracle request and returns, and the round stays
/// in an awaiting state until the oracle dispatcher invokes
/// `fulfill_randomness` with the matching request id.
pub struct RaffleModule {
    config: RaffleConfig,
    owner: AccountAddress,
    /// Account this module reports to the vault under
    address: AccountAddress,
    /// Only this caller may deliver randomness fulfillments
    oracle_dispatcher: AccountAddress,
    randomness: Arc<dyn RandomnessSource>,
    transfer: Arc<dyn FundsTransfer>,
    vault: Arc<RwLock<Option<Arc<Vault>>>>,
    rounds: Arc<RwLock<HashMap<RoundId, RaffleRound>>>,
    current_round: Arc<RwLock<RoundId>>,
    collectibles: CollectibleRegistry,

    // Metrics
    pub tickets_sold_total: Option<Arc<prometheus::IntCounter>>,
    pub randomness_requests_total: Option<Arc<prometheus::IntCounter>>,
    pub rounds_settled_total: Option<Arc<prometheus::IntCounter>>,
}

impl RaffleModule {
    pub fn new(
        config: RaffleConfig,
        owner: AccountAddress,
        oracle_dispatcher: AccountAddress,
        randomness: Arc<dyn RandomnessSource>,
        transfer: Arc<dyn FundsTransfer>,
    ) -> Self {
        Self {
            config,
            owner,
            address: AccountAddress::raffle(),
            oracle_dispatcher,
            randomness,
            transfer,
            vault: Arc::new(RwLock::new(None)),
            rounds: Arc::new(RwLock::new(HashMap::new())),
            current_round: Arc::new(RwLock::new(0)),
            collectibles: CollectibleRegistry::new(),
            tickets_sold_total: None,
            randomness_requests_total: None,
            rounds_settled_total: None,
        }
    }

    /// Set metrics for raffle tracking
    pub fn set_metrics(
        &mut self,
        tickets_sold_total: Arc<prometheus::IntCounter>,
        randomness_requests_total: Arc<prometheus::IntCounter>,
        rounds_settled_total: Arc<prometheus::IntCounter>,
    ) {
        self.tickets_sold_total = Some(tickets_sold_total);
        self.randomness_requests_total = Some(randomness_requests_total);
        self.rounds_settled_total = Some(rounds_settled_total);
    }

    /// Address this module acts under (whitelist it via governance before
    /// the first draw so fee reporting is accepted by the vault).
    pub fn address(&self) -> AccountAddress {
        self.address
    }

    fn require_owner(&self, caller: AccountAddress) -> Result<()> {
        if caller != self.owner {
            return Err(RaffleError::NotOwner { caller });
        }
        Ok(())
    }

    /// One-time setup: bind the treasury vault and open round 1.
    pub async fn set_treasury_vault(&self, caller: AccountAddress, vault: Arc<Vault>) -> Result<()> {
        self.require_owner(caller)?;
        let mut bound = self.vault.write().await;
        if bound.is_some() {
            return Err(RaffleError::SetupAlreadyDone);
        }
        *bound = Some(vault);
        drop(bound);

        let mut rounds = self.rounds.write().await;
        let mut current = self.current_round.write().await;
        let now = Utc::now();
        let round = RaffleRound::new(1, now, now + Duration::seconds(self.config.round_duration_secs));
        info!(
            round_id = round.id,
            ends_at = %round.end_time,
            ticket_price = self.config.ticket_price.to_units(),
            "🎟️ Raffle opened"
        );
        rounds.insert(1, round);
        *current = 1;
        Ok(())
    }

    async fn require_vault(&self) -> Result<Arc<Vault>> {
        let vault = self.vault.read().await;
        vault.clone().ok_or(RaffleError::SetupIncomplete)
    }

    /// Enter the current round. The attached value must equal the ticket
    /// price exactly; one entry per account per round.
    pub async fn participate(&self, caller: AccountAddress, attached: Amount) -> Result<()> {
        self.require_vault().await?;

        let current = *self.current_round.read().await;
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&current)
            .ok_or(RaffleError::UnknownRound(current))?;

        if !round.is_active {
            return Err(RaffleError::RoundInactive(current));
        }
        if round.ended(Utc::now()) {
            return Err(RaffleError::RoundEnded(current));
        }
        if round.entrants.contains(&caller) {
            return Err(RaffleError::AlreadyEntered {
                round: current,
                account: caller,
            });
        }
        if attached != self.config.ticket_price {
            return Err(RaffleError::WrongTicketPrice {
                expected: self.config.ticket_price,
                attached,
            });
        }

        round.entrants.insert(caller);
        round.participants.push(caller);
        round.total_prize = round.total_prize.saturating_add(attached);

        if let Some(ref counter) = self.tickets_sold_total {
            counter.inc();
        }
        info!(
            round_id = current,
            participant = %caller,
            index = round.participants.len() - 1,
            total_prize = round.total_prize.to_units(),
            "🎫 Raffle entry"
        );
        Ok(())
    }

    /// Settle or begin settling the current round once its end time has
    /// passed. Below the minimum entrant count the round refunds
    /// immediately; otherwise an asynchronous randomness request is issued
    /// and the round stays open awaiting the oracle callback. Refund and
    /// winner draw are mutually exclusive outcomes.
    pub async fn draw_winner(&self) -> Result<()> {
        self.require_vault().await?;

        let current = *self.current_round.read().await;
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&current)
            .ok_or(RaffleError::UnknownRound(current))?;

        let now = Utc::now();
        if !round.ended(now) {
            return Err(RaffleError::RoundNotEnded(current));
        }
        if round.prize_distributed {
            return Err(RaffleError::AlreadyDistributed(current));
        }
        if round.pending_request.is_some() {
            return Err(RaffleError::DrawPending(current));
        }

        if round.participants.len() < self.config.min_participants {
            self.refund_round(round).await?;
            let next = Self::open_next_round(round.id, now, &self.config);
            let next_id = next.id;
            rounds.insert(next_id, next);
            *self.current_round.write().await = next_id;
            return Ok(());
        }

        let request = RandomnessRequest {
            oracle_endpoint: self.config.oracle_endpoint,
            requester: self.address,
            sponsor: self.owner,
            callback: self.address,
            callback_method: "fulfill_randomness".to_string(),
            params: round.id.to_le_bytes().to_vec(),
        };
        let request_id = self
            .randomness
            .request_randomness(request)
            .await
            .map_err(|e| RaffleError::RandomnessRequestFailed(e.to_string()))?;

        round.pending_request = Some(request_id);
        if let Some(ref counter) = self.randomness_requests_total {
            counter.inc();
        }
        info!(
            round_id = current,
            request_id,
            participants = round.participants.len(),
            total_prize = round.total_prize.to_units(),
            "🎲 Randomness requested, round awaiting fulfillment"
        );
        Ok(())
    }

    /// Oracle callback. Restricted to the configured dispatcher address;
    /// correlates the request id against open rounds (linear scan — rounds
    /// advance sequentially, so at most one is pending), selects the winner
    /// and a rarity tier, pays out, mints the collectible, and advances to
    /// the next round.
    pub async fn fulfill_randomness(
        &self,
        caller: AccountAddress,
        request_id: RequestId,
        data: &[u8],
    ) -> Result<TokenId> {
        if caller != self.oracle_dispatcher {
            return Err(RaffleError::UnauthorizedOracle { caller });
        }
        let vault = self.require_vault().await?;

        let mut rounds = self.rounds.write().await;
        let round = rounds
            .values_mut()
            .find(|r| r.pending_request == Some(request_id) && !r.prize_distributed)
            .ok_or(RaffleError::UnknownRequest(request_id))?;

        let value = decode_random_value(data).ok_or(RaffleError::MalformedRandomness)?;

        let winner_index = (value % round.participants.len() as u64) as usize;
        let winner = round.participants[winner_index];
        let rarity = Self::select_rarity(value >> 16, &self.config.rarity_weights);

        let fee = round.total_prize.bps(self.config.platform_fee_bps);
        let winner_amount = round.total_prize.saturating_sub(fee);

        // The vault only accepts profit from whitelisted strategies; probe
        // up front so a misconfigured deployment aborts before any payout.
        if !vault.is_strategy_whitelisted(self.address).await? {
            return Err(RaffleError::Treasury(
                agora_treasury::TreasuryError::NotWhitelisted {
                    caller: self.address,
                },
            ));
        }

        self.transfer
            .transfer(winner, winner_amount, TransferReason::PrizePayout)
            .await
            .map_err(|e| RaffleError::TransferFailed {
                to: winner,
                reason: e.to_string(),
            })?;
        vault.profit_in(self.address, fee).await?;

        let token_id = self.collectibles.mint(winner, rarity, round.id).await;

        round.pending_request = None;
        round.prize_distributed = true;
        round.is_active = false;

        if let Some(ref counter) = self.rounds_settled_total {
            counter.inc();
        }
        info!(
            round_id = round.id,
            request_id,
            random_value = value,
            winner = %winner,
            winner_index,
            winner_amount = winner_amount.to_units(),
            fee = fee.to_units(),
            rarity = %rarity,
            token_id,
            "🏆 Raffle round settled with winner"
        );

        let settled_id = round.id;
        let next = Self::open_next_round(settled_id, Utc::now(), &self.config);
        let next_id = next.id;
        rounds.insert(next_id, next);
        *self.current_round.write().await = next_id;

        Ok(token_id)
    }

    /// Owner override: force the refund path for an ended, undistributed
    /// round. Also clears a stuck pending randomness request, and recovers
    /// funds from an emergency-stopped round.
    pub async fn manual_draw(&self, caller: AccountAddress, round_id: RoundId) -> Result<()> {
        self.require_owner(caller)?;
        self.require_vault().await?;

        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&round_id)
            .ok_or(RaffleError::UnknownRound(round_id))?;

        let now = Utc::now();
        if !round.ended(now) {
            return Err(RaffleError::RoundNotEnded(round_id));
        }
        if round.prize_distributed {
            return Err(RaffleError::AlreadyDistributed(round_id));
        }

        if let Some(request_id) = round.pending_request.take() {
            warn!(
                round_id,
                request_id, "🧹 Clearing stuck randomness request before forced refund"
            );
        }
        self.refund_round(round).await?;

        // Only advance if the refunded round is still the open one
        let mut current = self.current_round.write().await;
        if *current == round_id {
            let next = Self::open_next_round(round_id, now, &self.config);
            let next_id = next.id;
            rounds.insert(next_id, next);
            *current = next_id;
        }
        Ok(())
    }

    /// Owner override: deactivate a round without settling its prize
    /// state. Funds stay recoverable through `manual_draw` once the round
    /// has ended.
    pub async fn emergency_stop(&self, caller: AccountAddress, round_id: RoundId) -> Result<()> {
        self.require_owner(caller)?;

        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&round_id)
            .ok_or(RaffleError::UnknownRound(round_id))?;
        if round.prize_distributed {
            return Err(RaffleError::AlreadyDistributed(round_id));
        }

        round.is_active = false;
        warn!(
            round_id,
            participants = round.participants.len(),
            total_prize = round.total_prize.to_units(),
            "🛑 Raffle round emergency-stopped"
        );
        Ok(())
    }

    /// Refund every entrant their ticket price and mark the round settled.
    async fn refund_round(&self, round: &mut RaffleRound) -> Result<()> {
        for participant in round.participants.iter() {
            self.transfer
                .transfer(
                    *participant,
                    self.config.ticket_price,
                    TransferReason::TicketRefund,
                )
                .await
                .map_err(|e| RaffleError::TransferFailed {
                    to: *participant,
                    reason: e.to_string(),
                })?;
        }

        round.total_prize = Amount::ZERO;
        round.prize_distributed = true;
        round.is_active = false;

        if let Some(ref counter) = self.rounds_settled_total {
            counter.inc();
        }
        info!(
            round_id = round.id,
            refunded = round.participants.len(),
            ticket_price = self.config.ticket_price.to_units(),
            "↩️ Raffle round refunded"
        );
        Ok(())
    }

    fn open_next_round(previous: RoundId, now: DateTime<Utc>, config: &RaffleConfig) -> RaffleRound {
        let round = RaffleRound::new(
            previous + 1,
            now,
            now + Duration::seconds(config.round_duration_secs),
        );
        info!(round_id = round.id, ends_at = %round.end_time, "🆕 Raffle round opened");
        round
    }

    /// Rarity selection over cumulative thresholds: the first tier whose
    /// cumulative weight exceeds the scaled remainder wins, falling back to
    /// the first tier.
    fn select_rarity(slice: u64, weights: &[u64; 4]) -> RarityTier {
        let roll = slice % 100;
        let mut cumulative = 0u64;
        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if roll < cumulative {
                return RarityTier::from_index(index);
            }
        }
        RarityTier::Common
    }

    pub async fn round_info(&self, round_id: RoundId) -> Result<RoundInfo> {
        let rounds = self.rounds.read().await;
        let round = rounds
            .get(&round_id)
            .ok_or(RaffleError::UnknownRound(round_id))?;
        Ok(RoundInfo::from(round))
    }

    pub async fn current_round_info(&self) -> Result<RoundInfo> {
        let current = *self.current_round.read().await;
        self.round_info(current).await
    }

    /// Collectible metadata lookup by token id.
    pub async fn collectible(&self, token_id: TokenId) -> Option<crate::types::Collectible> {
        self.collectibles.collectible(token_id).await
    }

    pub async fn collectibles_minted(&self) -> u64 {
        self.collectibles.total_minted().await
    }

    /// Test helper: move a round's end time.
    /// Needed by tests that simulate an expired round.
    #[doc(hidden)]
    pub async fn test_set_round_end(&self, round_id: RoundId, end_time: DateTime<Utc>) -> Result<()> {
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&round_id)
            .ok_or(RaffleError::UnknownRound(round_id))?;
        round.end_time = end_time;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_rarity_thresholds() {
        let weights = [60, 25, 10, 5];
        assert_eq!(RaffleModule::select_rarity(0, &weights), RarityTier::Common);
        assert_eq!(RaffleModule::select_rarity(59, &weights), RarityTier::Common);
        assert_eq!(RaffleModule::select_rarity(60, &weights), RarityTier::Rare);
        assert_eq!(RaffleModule::select_rarity(84, &weights), RarityTier::Rare);
        assert_eq!(RaffleModule::select_rarity(85, &weights), RarityTier::Epic);
        assert_eq!(RaffleModule::select_rarity(94, &weights), RarityTier::Epic);
        assert_eq!(
            RaffleModule::select_rarity(95, &weights),
            RarityTier::Legendary
        );
        assert_eq!(
            RaffleModule::select_rarity(99, &weights),
            RarityTier::Legendary
        );
        // Wraps modulo 100
        assert_eq!(RaffleModule::select_rarity(100, &weights), RarityTier::Common);
    }
}
