use crate::{LedgerError, Result};
use agora_types::{AccountAddress, Amount};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Vesting configuration for governance-token voting weight
#[derive(Debug, Clone)]
pub struct VestingConfig {
    /// Seconds a minted claim must age before it counts toward voting weight
    pub vesting_period_secs: i64,
}

impl Default for VestingConfig {
    fn default() -> Self {
        Self {
            vesting_period_secs: 24 * 3600, // 1 day
        }
    }
}

/// A single minted batch awaiting vesting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingClaim {
    pub minted_at: DateTime<Utc>,
    pub amount: Amount,
}

#[derive(Debug, Default)]
struct AccountVesting {
    /// Time-ordered minted batches; append-only
    claims: Vec<VestingClaim>,
    /// Index of the first claim that has not fully vested
    cursor: usize,
    /// Cached vested voting weight
    vested_weight: Amount,
}

/// Governance-token ledger with time-vested voting weight.
///
/// Every mint records a claim `{now, amount}`; a claim contributes to the
/// account's voting weight once it is at least one vesting period old. The
/// cached weight is refreshed lazily on mint, burn, and weight queries by
/// walking the claim sequence from a monotone cursor — claims are
/// time-ordered, so the walk stops at the first claim still too young.
pub struct GovernanceToken {
    owner: AccountAddress,
    config: VestingConfig,
    balances: Arc<RwLock<HashMap<AccountAddress, Amount>>>,
    vesting: Arc<RwLock<HashMap<AccountAddress, AccountVesting>>>,
    total_supply: Arc<RwLock<Amount>>,
}

impl GovernanceToken {
    pub fn new(owner: AccountAddress, config: VestingConfig) -> Self {
        Self {
            owner,
            config,
            balances: Arc::new(RwLock::new(HashMap::new())),
            vesting: Arc::new(RwLock::new(HashMap::new())),
            total_supply: Arc::new(RwLock::new(Amount::ZERO)),
        }
    }

    fn require_owner(&self, caller: AccountAddress) -> Result<()> {
        if caller != self.owner {
            return Err(LedgerError::NotOwner { caller });
        }
        Ok(())
    }

    /// Advance the vesting cursor past every fully-vested claim,
    /// accumulating their amounts into the cached weight.
    fn refresh_vesting(entry: &mut AccountVesting, vesting_period: Duration, now: DateTime<Utc>) {
        while entry.cursor < entry.claims.len() {
            let claim = &entry.claims[entry.cursor];
            if now - claim.minted_at < vesting_period {
                // Claims are time-ordered: nothing later can be vested either
                break;
            }
            entry.vested_weight = entry.vested_weight.saturating_add(claim.amount);
            entry.cursor += 1;
        }
    }

    pub async fn mint(&self, caller: AccountAddress, to: AccountAddress, amount: Amount) -> Result<()> {
        self.require_owner(caller)?;
        if amount.is_zero() {
            return Ok(());
        }

        let now = Utc::now();
        let mut balances = self.balances.write().await;
        let mut vesting = self.vesting.write().await;
        let mut supply = self.total_supply.write().await;

        let current = balances.get(&to).copied().unwrap_or(Amount::ZERO);
        let new_balance = current
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(to))?;

        let entry = vesting.entry(to).or_default();
        entry.claims.push(VestingClaim {
            minted_at: now,
            amount,
        });
        Self::refresh_vesting(entry, Duration::seconds(self.config.vesting_period_secs), now);

        balances.insert(to, new_balance);
        *supply = supply.saturating_add(amount);

        info!(
            account = %to,
            amount = amount.to_units(),
            balance_after = new_balance.to_units(),
            vested_weight = entry.vested_weight.to_units(),
            pending_claims = entry.claims.len() - entry.cursor,
            "🗳️ Governance tokens minted"
        );
        Ok(())
    }

    /// Burn tokens. The cached voting weight is reduced first, flooring at
    /// zero when the burn exceeds the currently-vested weight; unvested
    /// claims are left in place.
    pub async fn burn(&self, caller: AccountAddress, from: AccountAddress, amount: Amount) -> Result<()> {
        self.require_owner(caller)?;
        if amount.is_zero() {
            return Ok(());
        }

        let now = Utc::now();
        let mut balances = self.balances.write().await;
        let mut vesting = self.vesting.write().await;
        let mut supply = self.total_supply.write().await;

        let current = balances.get(&from).copied().unwrap_or(Amount::ZERO);
        let new_balance = current
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: from,
                has: current,
                needs: amount,
            })?;

        let entry = vesting.entry(from).or_default();
        Self::refresh_vesting(entry, Duration::seconds(self.config.vesting_period_secs), now);
        let weight_before = entry.vested_weight;
        entry.vested_weight = entry.vested_weight.saturating_sub(amount);

        if new_balance.is_zero() {
            balances.remove(&from);
        } else {
            balances.insert(from, new_balance);
        }
        *supply = supply.saturating_sub(amount);

        info!(
            account = %from,
            amount = amount.to_units(),
            balance_after = new_balance.to_units(),
            weight_before = weight_before.to_units(),
            weight_after = entry.vested_weight.to_units(),
            "🔥 Governance tokens burned"
        );
        Ok(())
    }

    /// Current voting weight with a lazy vesting refresh.
    pub async fn voting_weight(&self, account: AccountAddress) -> Amount {
        let now = Utc::now();
        let mut vesting = self.vesting.write().await;
        let Some(entry) = vesting.get_mut(&account) else {
            return Amount::ZERO;
        };
        let cursor_before = entry.cursor;
        Self::refresh_vesting(entry, Duration::seconds(self.config.vesting_period_secs), now);
        if entry.cursor != cursor_before {
            debug!(
                account = %account,
                newly_vested = entry.cursor - cursor_before,
                vested_weight = entry.vested_weight.to_units(),
                "Vesting cursor advanced"
            );
        }
        entry.vested_weight
    }

    /// Pure read of the cached weight, without refreshing vesting.
    pub async fn current_voting_weight(&self, account: AccountAddress) -> Amount {
        let vesting = self.vesting.read().await;
        vesting
            .get(&account)
            .map(|e| e.vested_weight)
            .unwrap_or(Amount::ZERO)
    }

    pub async fn balance_of(&self, account: AccountAddress) -> Amount {
        let balances = self.balances.read().await;
        balances.get(&account).copied().unwrap_or(Amount::ZERO)
    }

    pub async fn total_supply(&self) -> Amount {
        *self.total_supply.read().await
    }

    /// Test helper: age an account's claims by `secs` seconds.
    /// Needed by tests that simulate elapsed vesting periods.
    #[doc(hidden)]
    pub async fn test_backdate_claims(&self, account: AccountAddress, secs: i64) {
        let mut vesting = self.vesting.write().await;
        if let Some(entry) = vesting.get_mut(&account) {
            for claim in entry.claims.iter_mut() {
                claim.minted_at -= Duration::seconds(secs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_vesting() -> VestingConfig {
        VestingConfig {
            vesting_period_secs: 3600,
        }
    }

    #[tokio::test]
    async fn test_fresh_mint_has_no_weight() {
        let owner = AccountAddress::portal();
        let token = GovernanceToken::new(owner, short_vesting());
        let user = AccountAddress::from_bytes([1; 32]);

        token.mint(owner, user, Amount::from_units(10)).await.unwrap();
        assert_eq!(token.balance_of(user).await, Amount::from_units(10));
        assert_eq!(token.voting_weight(user).await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_weight_vests_after_period() {
        let owner = AccountAddress::portal();
        let token = GovernanceToken::new(owner, short_vesting());
        let user = AccountAddress::from_bytes([2; 32]);

        token.mint(owner, user, Amount::from_units(10)).await.unwrap();
        token.test_backdate_claims(user, 3601).await;

        assert_eq!(token.voting_weight(user).await, Amount::from_units(10));
        // Cache now reflects the vested amount without a further refresh
        assert_eq!(
            token.current_voting_weight(user).await,
            Amount::from_units(10)
        );
    }

    #[tokio::test]
    async fn test_partial_vesting_stops_at_young_claim() {
        let owner = AccountAddress::portal();
        let token = GovernanceToken::new(owner, short_vesting());
        let user = AccountAddress::from_bytes([3; 32]);

        token.mint(owner, user, Amount::from_units(4)).await.unwrap();
        token.test_backdate_claims(user, 3601).await;
        // Second claim is fresh and must not vest
        token.mint(owner, user, Amount::from_units(6)).await.unwrap();

        assert_eq!(token.voting_weight(user).await, Amount::from_units(4));
        assert_eq!(token.balance_of(user).await, Amount::from_units(10));
    }

    #[tokio::test]
    async fn test_burn_floors_weight_at_zero() {
        let owner = AccountAddress::portal();
        let token = GovernanceToken::new(owner, short_vesting());
        let user = AccountAddress::from_bytes([4; 32]);

        token.mint(owner, user, Amount::from_units(5)).await.unwrap();
        token.test_backdate_claims(user, 3601).await;
        token.mint(owner, user, Amount::from_units(5)).await.unwrap();

        // Vested weight is 5; burning 8 floors the weight at zero
        token.burn(owner, user, Amount::from_units(8)).await.unwrap();
        assert_eq!(token.current_voting_weight(user).await, Amount::ZERO);
        assert_eq!(token.balance_of(user).await, Amount::from_units(2));
    }

    #[tokio::test]
    async fn test_burn_insufficient_balance() {
        let owner = AccountAddress::portal();
        let token = GovernanceToken::new(owner, short_vesting());
        let user = AccountAddress::from_bytes([5; 32]);

        token.mint(owner, user, Amount::from_units(3)).await.unwrap();
        let result = token.burn(owner, user, Amount::from_units(4)).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_weight_query_is_monotone_in_cursor() {
        let owner = AccountAddress::portal();
        let token = GovernanceToken::new(owner, short_vesting());
        let user = AccountAddress::from_bytes([6; 32]);

        for _ in 0..3 {
            token.mint(owner, user, Amount::from_units(2)).await.unwrap();
        }
        token.test_backdate_claims(user, 3601).await;

        assert_eq!(token.voting_weight(user).await, Amount::from_units(6));
        // Re-querying does not double count
        assert_eq!(token.voting_weight(user).await, Amount::from_units(6));
    }
}
