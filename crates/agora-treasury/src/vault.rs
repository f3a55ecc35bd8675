use crate::storage::{LedgerDirection, LedgerEntry, TreasuryStorage};
use crate::transfer::{FundsTransfer, TransferReason};
use crate::{Result, TreasuryError};
use agora_types::{AccountAddress, Amount};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Lookup into the governance strategy whitelist.
///
/// The vault never owns the whitelist; it queries the governance core
/// through this seam before honoring a strategy-initiated fund movement.
#[async_trait]
pub trait StrategyLookup: Send + Sync {
    async fn is_whitelisted(&self, strategy: AccountAddress) -> bool;
}

/// The treasury vault.
///
/// Holds the pooled base asset, records per-account deposit/withdraw
/// history, and gates outbound transfers: user flows go through the portal,
/// strategy flows require whitelist membership. Ledger state is finalized
/// under a storage snapshot before any external transfer call, and a failed
/// transfer rolls the snapshot back.
pub struct Vault {
    portal: AccountAddress,
    storage: Arc<dyn TreasuryStorage>,
    transfer: Arc<dyn FundsTransfer>,
    whitelist: Arc<RwLock<Option<Arc<dyn StrategyLookup>>>>,
}

impl Vault {
    pub fn new(
        portal: AccountAddress,
        storage: Arc<dyn TreasuryStorage>,
        transfer: Arc<dyn FundsTransfer>,
    ) -> Self {
        Self {
            portal,
            storage,
            transfer,
            whitelist: Arc::new(RwLock::new(None)),
        }
    }

    /// Register the whitelist lookup, once.
    pub async fn register_whitelist(&self, lookup: Arc<dyn StrategyLookup>) -> Result<()> {
        let mut whitelist = self.whitelist.write().await;
        if whitelist.is_some() {
            return Err(TreasuryError::WhitelistAlreadyRegistered);
        }
        *whitelist = Some(lookup);
        info!("🔗 Strategy whitelist lookup registered");
        Ok(())
    }

    fn require_portal(&self, caller: AccountAddress) -> Result<()> {
        if caller != self.portal {
            return Err(TreasuryError::NotPortal { caller });
        }
        Ok(())
    }

    async fn require_whitelisted(&self, caller: AccountAddress) -> Result<()> {
        let whitelist = self.whitelist.read().await;
        let lookup = whitelist
            .as_ref()
            .ok_or(TreasuryError::WhitelistNotRegistered)?;
        if !lookup.is_whitelisted(caller).await {
            return Err(TreasuryError::NotWhitelisted { caller });
        }
        Ok(())
    }

    /// Portal-gated deposit. The attached value must equal the declared
    /// amount; the funds are considered received with the call.
    pub async fn deposit(
        &self,
        caller: AccountAddress,
        user: AccountAddress,
        amount: Amount,
        attached: Amount,
    ) -> Result<()> {
        self.require_portal(caller)?;
        if attached != amount {
            return Err(TreasuryError::AttachedValueMismatch {
                expected: amount,
                attached,
            });
        }

        let total = self.storage.total_assets().await?;
        let new_total = total
            .checked_add(amount)
            .ok_or(TreasuryError::BalanceOverflow)?;

        self.storage.begin_transaction().await?;
        self.storage
            .append_entry(LedgerEntry {
                account: user,
                amount,
                direction: LedgerDirection::Deposit,
                timestamp: Utc::now(),
            })
            .await?;
        self.storage.set_total_assets(new_total).await?;
        self.storage.commit_transaction().await?;

        info!(
            user = %user,
            amount = amount.to_units(),
            total_before = total.to_units(),
            total_after = new_total.to_units(),
            "💰 Vault deposit"
        );
        Ok(())
    }

    /// Portal-gated withdrawal. Ledger state is finalized first; the
    /// external payout is checked and rolls everything back on failure.
    pub async fn withdraw(
        &self,
        caller: AccountAddress,
        user: AccountAddress,
        amount: Amount,
    ) -> Result<()> {
        self.require_portal(caller)?;

        let total = self.storage.total_assets().await?;
        let new_total = total
            .checked_sub(amount)
            .ok_or(TreasuryError::InsufficientFunds {
                available: total,
                requested: amount,
            })?;

        self.storage.begin_transaction().await?;
        self.storage
            .append_entry(LedgerEntry {
                account: user,
                amount,
                direction: LedgerDirection::Withdrawal,
                timestamp: Utc::now(),
            })
            .await?;
        self.storage.set_total_assets(new_total).await?;

        match self
            .transfer
            .transfer(user, amount, TransferReason::Withdrawal)
            .await
        {
            Ok(()) => {
                self.storage.commit_transaction().await?;
                info!(
                    user = %user,
                    amount = amount.to_units(),
                    total_after = new_total.to_units(),
                    "💸 Vault withdrawal paid out"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    user = %user,
                    amount = amount.to_units(),
                    error = %e,
                    "❌ Withdrawal payout failed, rolling back"
                );
                self.storage.rollback_transaction().await?;
                Err(TreasuryError::TransferFailed {
                    to: user,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Strategy-initiated pull. Callable by any address, but the caller
    /// itself must be on the governance whitelist.
    pub async fn call_transfer(
        &self,
        caller: AccountAddress,
        to: AccountAddress,
        amount: Amount,
    ) -> Result<()> {
        self.require_whitelisted(caller).await?;

        let total = self.storage.total_assets().await?;
        let new_total = total
            .checked_sub(amount)
            .ok_or(TreasuryError::InsufficientFunds {
                available: total,
                requested: amount,
            })?;

        self.storage.begin_transaction().await?;
        self.storage.set_total_assets(new_total).await?;

        match self
            .transfer
            .transfer(to, amount, TransferReason::StrategyPull)
            .await
        {
            Ok(()) => {
                self.storage.commit_transaction().await?;
                info!(
                    strategy = %caller,
                    to = %to,
                    amount = amount.to_units(),
                    total_after = new_total.to_units(),
                    "🏦 Strategy pull executed"
                );
                Ok(())
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(TreasuryError::TransferFailed {
                    to,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Profit report from a whitelisted strategy. Accounting only: the
    /// caller is trusted to have already sent the matching funds, unlike
    /// the deposit path which verifies the attached value.
    pub async fn profit_in(&self, caller: AccountAddress, amount: Amount) -> Result<()> {
        self.require_whitelisted(caller).await?;

        let total = self.storage.total_assets().await?;
        let new_total = total
            .checked_add(amount)
            .ok_or(TreasuryError::BalanceOverflow)?;
        self.storage.set_total_assets(new_total).await?;

        info!(
            strategy = %caller,
            amount = amount.to_units(),
            total_after = new_total.to_units(),
            "📈 Strategy profit reported"
        );
        Ok(())
    }

    pub async fn total_assets(&self) -> Result<Amount> {
        Ok(self.storage.total_assets().await?)
    }

    /// Read-only whitelist probe for strategies that want to verify their
    /// own standing before moving value.
    pub async fn is_strategy_whitelisted(&self, strategy: AccountAddress) -> Result<bool> {
        let whitelist = self.whitelist.read().await;
        let lookup = whitelist
            .as_ref()
            .ok_or(TreasuryError::WhitelistNotRegistered)?;
        Ok(lookup.is_whitelisted(strategy).await)
    }

    pub async fn deposit_history(&self, user: AccountAddress) -> Result<Vec<LedgerEntry>> {
        Ok(self.storage.history(user, LedgerDirection::Deposit).await?)
    }

    pub async fn withdrawal_history(&self, user: AccountAddress) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .storage
            .history(user, LedgerDirection::Withdrawal)
            .await?)
    }

    pub async fn history_paginated(
        &self,
        user: AccountAddress,
        direction: LedgerDirection,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<LedgerEntry>, Option<usize>)> {
        Ok(self
            .storage
            .history_paginated(user, direction, limit, offset)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::transfer::RecordingTransfer;
    use std::collections::HashSet;

    struct FixedWhitelist(HashSet<AccountAddress>);

    #[async_trait]
    impl StrategyLookup for FixedWhitelist {
        async fn is_whitelisted(&self, strategy: AccountAddress) -> bool {
            self.0.contains(&strategy)
        }
    }

    fn build_vault() -> (Vault, Arc<RecordingTransfer>) {
        let transfer = Arc::new(RecordingTransfer::new());
        let vault = Vault::new(
            AccountAddress::portal(),
            Arc::new(MemoryStorage::new()),
            transfer.clone(),
        );
        (vault, transfer)
    }

    #[tokio::test]
    async fn test_deposit_requires_portal_and_matching_value() {
        let (vault, _) = build_vault();
        let portal = AccountAddress::portal();
        let user = AccountAddress::from_bytes([1; 32]);

        let result = vault
            .deposit(user, user, Amount::from_units(10), Amount::from_units(10))
            .await;
        assert!(matches!(result, Err(TreasuryError::NotPortal { .. })));

        let result = vault
            .deposit(portal, user, Amount::from_units(10), Amount::from_units(9))
            .await;
        assert!(matches!(
            result,
            Err(TreasuryError::AttachedValueMismatch { .. })
        ));

        vault
            .deposit(portal, user, Amount::from_units(10), Amount::from_units(10))
            .await
            .unwrap();
        assert_eq!(vault.total_assets().await.unwrap(), Amount::from_units(10));
        assert_eq!(vault.deposit_history(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_pays_out_and_records() {
        let (vault, transfer) = build_vault();
        let portal = AccountAddress::portal();
        let user = AccountAddress::from_bytes([2; 32]);

        vault
            .deposit(portal, user, Amount::from_units(50), Amount::from_units(50))
            .await
            .unwrap();
        vault
            .withdraw(portal, user, Amount::from_units(20))
            .await
            .unwrap();

        assert_eq!(vault.total_assets().await.unwrap(), Amount::from_units(30));
        assert_eq!(vault.withdrawal_history(user).await.unwrap().len(), 1);
        assert_eq!(transfer.total_paid(user).await, Amount::from_units(20));
    }

    #[tokio::test]
    async fn test_failed_payout_rolls_back() {
        let (vault, transfer) = build_vault();
        let portal = AccountAddress::portal();
        let user = AccountAddress::from_bytes([3; 32]);

        vault
            .deposit(portal, user, Amount::from_units(50), Amount::from_units(50))
            .await
            .unwrap();

        transfer.set_failing(true).await;
        let result = vault.withdraw(portal, user, Amount::from_units(20)).await;
        assert!(matches!(result, Err(TreasuryError::TransferFailed { .. })));

        // No partial state: total and history both untouched
        assert_eq!(vault.total_assets().await.unwrap(), Amount::from_units(50));
        assert!(vault.withdrawal_history(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds() {
        let (vault, _) = build_vault();
        let portal = AccountAddress::portal();
        let user = AccountAddress::from_bytes([4; 32]);

        let result = vault.withdraw(portal, user, Amount::from_units(1)).await;
        assert!(matches!(
            result,
            Err(TreasuryError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_strategy_gating() {
        let (vault, _) = build_vault();
        let portal = AccountAddress::portal();
        let strategy = AccountAddress::from_bytes([7; 32]);
        let outsider = AccountAddress::from_bytes([8; 32]);
        let user = AccountAddress::from_bytes([9; 32]);

        vault
            .deposit(portal, user, Amount::from_units(100), Amount::from_units(100))
            .await
            .unwrap();

        // Before registration every strategy call fails
        let result = vault.profit_in(strategy, Amount::from_units(5)).await;
        assert!(matches!(
            result,
            Err(TreasuryError::WhitelistNotRegistered)
        ));

        vault
            .register_whitelist(Arc::new(FixedWhitelist(HashSet::from([strategy]))))
            .await
            .unwrap();

        let result = vault.call_transfer(outsider, outsider, Amount::from_units(5)).await;
        assert!(matches!(result, Err(TreasuryError::NotWhitelisted { .. })));

        vault
            .call_transfer(strategy, strategy, Amount::from_units(40))
            .await
            .unwrap();
        assert_eq!(vault.total_assets().await.unwrap(), Amount::from_units(60));

        // Profit report is accounting-only
        vault.profit_in(strategy, Amount::from_units(10)).await.unwrap();
        assert_eq!(vault.total_assets().await.unwrap(), Amount::from_units(70));
    }

    #[tokio::test]
    async fn test_whitelist_registers_once() {
        let (vault, _) = build_vault();
        let lookup: Arc<dyn StrategyLookup> = Arc::new(FixedWhitelist(HashSet::new()));
        vault.register_whitelist(lookup.clone()).await.unwrap();
        let result = vault.register_whitelist(lookup).await;
        assert!(matches!(
            result,
            Err(TreasuryError::WhitelistAlreadyRegistered)
        ));
    }
}
