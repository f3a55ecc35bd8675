use crate::pricing;
use crate::{PortalError, Result};
use agora_governance::{ActionKind, GovernanceCore, ProposalInfo};
use agora_ledger::{GovernanceToken, ShareToken};
use agora_treasury::{StrategyLookup, Vault};
use agora_types::{AccountAddress, Amount, ProposalId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Portal configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Smallest accepted deposit
    pub min_deposit: Amount,
    /// Smallest accepted withdrawal
    pub min_withdraw: Amount,
    /// Governance-token balance required to create a proposal
    pub proposal_threshold: Amount,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            min_deposit: Amount::from_units(1),
            min_withdraw: Amount::from_units(1),
            proposal_threshold: Amount::from_units(10),
        }
    }
}

/// Adapter giving the vault read access to the governance whitelist.
pub struct CoreStrategyLookup(pub Arc<GovernanceCore>);

#[async_trait]
impl StrategyLookup for CoreStrategyLookup {
    async fn is_whitelisted(&self, strategy: AccountAddress) -> bool {
        self.0.is_whitelisted(strategy).await
    }
}

/// Sole entry point for user value-bearing operations.
///
/// The portal recomputes the share price from live vault and share-supply
/// state before and after every mutation — price is never cached across
/// calls — and keeps each account's governance-token balance within its
/// tiered entitlement. Ledger mutations are sequenced so that every
/// fallible step (including the vault's checked external payout) happens
/// before any portal-ledger change; under the serialized call model the
/// remaining mutations cannot fail, so operations are atomic.
pub struct Portal {
    config: PortalConfig,
    address: AccountAddress,
    shares: Arc<ShareToken>,
    governance_token: Arc<GovernanceToken>,
    vault: Arc<Vault>,
    governance: Arc<GovernanceCore>,
    /// Last computed entitlement per account
    entitlements: Arc<RwLock<HashMap<AccountAddress, Amount>>>,
}

impl Portal {
    pub fn new(
        config: PortalConfig,
        shares: Arc<ShareToken>,
        governance_token: Arc<GovernanceToken>,
        vault: Arc<Vault>,
        governance: Arc<GovernanceCore>,
    ) -> Self {
        Self {
            config,
            address: AccountAddress::portal(),
            shares,
            governance_token,
            vault,
            governance,
            entitlements: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// Current value per share from live vault state.
    pub async fn share_price(&self) -> Result<u64> {
        let assets = self.vault.total_assets().await?;
        let supply = self.shares.total_supply().await;
        Ok(pricing::share_price(assets, supply))
    }

    async fn snapshot_entitlement(&self, account: AccountAddress, value: Amount) -> Amount {
        let entitled = pricing::entitlement(value);
        let mut entitlements = self.entitlements.write().await;
        entitlements.insert(account, entitled);
        entitled
    }

    /// Last snapshotted entitlement for an account.
    pub async fn entitlement_of(&self, account: AccountAddress) -> Amount {
        let entitlements = self.entitlements.read().await;
        entitlements.get(&account).copied().unwrap_or(Amount::ZERO)
    }

    /// Deposit base assets, minting shares at the pre-deposit price.
    /// Returns the number of shares minted.
    pub async fn deposit(
        &self,
        user: AccountAddress,
        amount: Amount,
        attached: Amount,
    ) -> Result<Amount> {
        if amount < self.config.min_deposit {
            return Err(PortalError::BelowMinimumDeposit {
                minimum: self.config.min_deposit,
                amount,
            });
        }

        let assets = self.vault.total_assets().await?;
        let supply = self.shares.total_supply().await;
        let price_before = pricing::share_price(assets, supply);

        let shares_to_mint = pricing::to_shares(amount, price_before);
        if shares_to_mint.is_zero() {
            return Err(PortalError::DepositTooSmall {
                amount,
                price: price_before,
            });
        }

        let price_after = pricing::share_price(
            assets.saturating_add(amount),
            supply.saturating_add(shares_to_mint),
        );

        // The vault verifies the attached value; it is the only fallible
        // step, so it runs before any portal-ledger mutation.
        self.vault.deposit(self.address, user, amount, attached).await?;
        self.shares.mint(self.address, user, shares_to_mint).await?;

        let balance_after = self.shares.balance_of(user).await;
        let entitled = self
            .snapshot_entitlement(user, pricing::to_value(balance_after, price_after))
            .await;

        info!(
            user = %user,
            amount = amount.to_units(),
            shares_minted = shares_to_mint.to_units(),
            price_before,
            price_after,
            entitlement = entitled.to_units(),
            "💰 Deposit settled"
        );
        Ok(shares_to_mint)
    }

    /// Withdraw a base-asset value; the share cost is computed at the
    /// pre-withdrawal price. Returns the number of shares burned.
    pub async fn withdraw_by_value(&self, user: AccountAddress, amount: Amount) -> Result<Amount> {
        if amount < self.config.min_withdraw {
            return Err(PortalError::BelowMinimumWithdraw {
                minimum: self.config.min_withdraw,
                amount,
            });
        }

        let assets = self.vault.total_assets().await?;
        let supply = self.shares.total_supply().await;
        let price_before = pricing::share_price(assets, supply);

        let shares_to_burn = pricing::to_shares(amount, price_before);
        if shares_to_burn.is_zero() {
            return Err(PortalError::WithdrawTooSmall {
                amount,
                price: price_before,
            });
        }

        self.settle_withdrawal(user, amount, shares_to_burn, assets, supply, price_before)
            .await?;
        Ok(shares_to_burn)
    }

    /// Withdraw an exact number of shares; the paid-out value is computed
    /// at the pre-withdrawal price. Returns the value paid out.
    pub async fn withdraw_by_shares(
        &self,
        user: AccountAddress,
        share_amount: Amount,
    ) -> Result<Amount> {
        let assets = self.vault.total_assets().await?;
        let supply = self.shares.total_supply().await;
        let price_before = pricing::share_price(assets, supply);

        let amount = pricing::to_value(share_amount, price_before);
        if amount < self.config.min_withdraw {
            return Err(PortalError::BelowMinimumWithdraw {
                minimum: self.config.min_withdraw,
                amount,
            });
        }

        self.settle_withdrawal(user, amount, share_amount, assets, supply, price_before)
            .await?;
        Ok(amount)
    }

    /// Shared withdrawal path: both variants burn shares, trim the
    /// governance-token balance to the post-withdrawal entitlement, and
    /// recompute the price from post-withdrawal state (1 when the last
    /// share leaves, avoiding a zero divisor).
    async fn settle_withdrawal(
        &self,
        user: AccountAddress,
        amount: Amount,
        shares_to_burn: Amount,
        assets: Amount,
        supply: Amount,
        price_before: u64,
    ) -> Result<()> {
        let user_shares = self.shares.balance_of(user).await;
        if user_shares < shares_to_burn {
            return Err(PortalError::InsufficientShares {
                account: user,
                has: user_shares,
                needs: shares_to_burn,
            });
        }

        let remaining_assets = assets.saturating_sub(amount);
        let remaining_supply = supply.saturating_sub(shares_to_burn);
        let price_after = pricing::share_price(remaining_assets, remaining_supply);

        let remaining_balance = user_shares.saturating_sub(shares_to_burn);
        let entitled = pricing::entitlement(pricing::to_value(remaining_balance, price_after));

        // Checked external payout first; the vault rolls itself back on a
        // failed transfer and the portal ledgers are still untouched.
        self.vault.withdraw(self.address, user, amount).await?;

        let gt_balance = self.governance_token.balance_of(user).await;
        if gt_balance > entitled {
            let excess = gt_balance.saturating_sub(entitled);
            debug!(
                user = %user,
                excess = excess.to_units(),
                entitlement = entitled.to_units(),
                "Burning governance tokens above entitlement"
            );
            self.governance_token.burn(self.address, user, excess).await?;
        }
        self.shares.burn(self.address, user, shares_to_burn).await?;

        let mut entitlements = self.entitlements.write().await;
        entitlements.insert(user, entitled);
        drop(entitlements);

        info!(
            user = %user,
            amount = amount.to_units(),
            shares_burned = shares_to_burn.to_units(),
            price_before,
            price_after,
            entitlement = entitled.to_units(),
            "💸 Withdrawal settled"
        );
        Ok(())
    }

    /// Mint the difference between the caller's theoretical entitlement
    /// and their current governance-token balance.
    pub async fn claim_governance_token(&self, user: AccountAddress) -> Result<Amount> {
        let assets = self.vault.total_assets().await?;
        let supply = self.shares.total_supply().await;
        let price = pricing::share_price(assets, supply);

        let balance = self.shares.balance_of(user).await;
        let entitled = self
            .snapshot_entitlement(user, pricing::to_value(balance, price))
            .await;
        if entitled.is_zero() {
            return Err(PortalError::ZeroEntitlement(user));
        }

        let gt_balance = self.governance_token.balance_of(user).await;
        let delta = entitled.saturating_sub(gt_balance);
        if delta.is_zero() {
            return Err(PortalError::NothingToClaim(user));
        }

        self.governance_token.mint(self.address, user, delta).await?;
        info!(
            user = %user,
            claimed = delta.to_units(),
            entitlement = entitled.to_units(),
            "🗳️ Governance tokens claimed"
        );
        Ok(delta)
    }

    /// Create a proposal on behalf of the caller; requires the configured
    /// governance-token balance.
    pub async fn create_proposal(
        &self,
        caller: AccountAddress,
        strategy: AccountAddress,
        description: String,
        action: ActionKind,
    ) -> Result<ProposalId> {
        let gt_balance = self.governance_token.balance_of(caller).await;
        if gt_balance < self.config.proposal_threshold {
            return Err(PortalError::InsufficientGovernanceTokens {
                required: self.config.proposal_threshold,
                actual: gt_balance,
            });
        }

        let id = self
            .governance
            .create_proposal(self.address, caller, strategy, description, action, Utc::now())
            .await?;
        Ok(id)
    }

    /// Vote with the caller's current (lazily vested) voting weight.
    /// Returns whether the vote was recorded; late and duplicate votes are
    /// soft-rejected.
    pub async fn vote_proposal(
        &self,
        caller: AccountAddress,
        id: ProposalId,
        support: bool,
    ) -> Result<bool> {
        let weight = self.governance_token.voting_weight(caller).await;
        let accepted = self
            .governance
            .vote(self.address, caller, id, weight, support)
            .await?;
        Ok(accepted)
    }

    /// Execute a decided proposal. Pure delegation; the governance core
    /// enforces the preconditions.
    pub async fn execute_proposal(&self, id: ProposalId) -> Result<()> {
        self.governance.execute_proposal(id).await?;
        Ok(())
    }

    /// Proposal detail passthrough for the query surface.
    pub async fn proposal_info(&self, id: ProposalId) -> Result<ProposalInfo> {
        Ok(self.governance.proposal_info(id).await?)
    }
}
