use crate::{LedgerError, Result};
use agora_types::{AccountAddress, Amount};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Fungible liquidity-share ledger.
///
/// Shares represent a proportional claim on the pooled vault assets. Only
/// the owning module (the portal) may mint or burn; shares are not
/// transferable between accounts, which keeps the governance-token
/// entitlement derivable from balances alone.
pub struct ShareToken {
    owner: AccountAddress,
    balances: Arc<RwLock<HashMap<AccountAddress, Amount>>>,
    total_supply: Arc<RwLock<Amount>>,
}

impl ShareToken {
    pub fn new(owner: AccountAddress) -> Self {
        Self {
            owner,
            balances: Arc::new(RwLock::new(HashMap::new())),
            total_supply: Arc::new(RwLock::new(Amount::ZERO)),
        }
    }

    fn require_owner(&self, caller: AccountAddress) -> Result<()> {
        if caller != self.owner {
            return Err(LedgerError::NotOwner { caller });
        }
        Ok(())
    }

    pub async fn mint(&self, caller: AccountAddress, to: AccountAddress, amount: Amount) -> Result<()> {
        self.require_owner(caller)?;
        if amount.is_zero() {
            return Ok(());
        }

        let mut balances = self.balances.write().await;
        let mut supply = self.total_supply.write().await;

        let current = balances.get(&to).copied().unwrap_or(Amount::ZERO);
        let new_balance = current
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(to))?;
        let new_supply = supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(to))?;

        balances.insert(to, new_balance);
        *supply = new_supply;

        info!(
            account = %to,
            amount = amount.to_units(),
            balance_after = new_balance.to_units(),
            total_supply = new_supply.to_units(),
            "🪙 Shares minted"
        );
        Ok(())
    }

    pub async fn burn(&self, caller: AccountAddress, from: AccountAddress, amount: Amount) -> Result<()> {
        self.require_owner(caller)?;
        if amount.is_zero() {
            return Ok(());
        }

        let mut balances = self.balances.write().await;
        let mut supply = self.total_supply.write().await;

        let current = balances.get(&from).copied().unwrap_or(Amount::ZERO);
        let new_balance = current
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: from,
                has: current,
                needs: amount,
            })?;

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
            total_supply = supply.to_units(),
            "🔥 Shares burned"
        );
        Ok(())
    }

    pub async fn balance_of(&self, account: AccountAddress) -> Amount {
        let balances = self.balances.read().await;
        balances.get(&account).copied().unwrap_or(Amount::ZERO)
    }

    pub async fn total_supply(&self) -> Amount {
        *self.total_supply.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mint_and_burn() {
        let owner = AccountAddress::portal();
        let token = ShareToken::new(owner);
        let user = AccountAddress::from_bytes([1; 32]);

        token.mint(owner, user, Amount::from_units(100)).await.unwrap();
        assert_eq!(token.balance_of(user).await, Amount::from_units(100));
        assert_eq!(token.total_supply().await, Amount::from_units(100));

        token.burn(owner, user, Amount::from_units(40)).await.unwrap();
        assert_eq!(token.balance_of(user).await, Amount::from_units(60));
        assert_eq!(token.total_supply().await, Amount::from_units(60));
    }

    #[tokio::test]
    async fn test_mint_requires_owner() {
        let owner = AccountAddress::portal();
        let token = ShareToken::new(owner);
        let stranger = AccountAddress::from_bytes([9; 32]);

        let result = token
            .mint(stranger, stranger, Amount::from_units(1))
            .await;
        assert!(matches!(result, Err(LedgerError::NotOwner { .. })));
    }

    #[tokio::test]
    async fn test_burn_more_than_balance_fails() {
        let owner = AccountAddress::portal();
        let token = ShareToken::new(owner);
        let user = AccountAddress::from_bytes([2; 32]);

        token.mint(owner, user, Amount::from_units(10)).await.unwrap();
        let result = token.burn(owner, user, Amount::from_units(11)).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        // Balance unchanged after the failed burn
        assert_eq!(token.balance_of(user).await, Amount::from_units(10));
    }

    #[tokio::test]
    async fn test_zero_amount_is_noop() {
        let owner = AccountAddress::portal();
        let token = ShareToken::new(owner);
        let user = AccountAddress::from_bytes([3; 32]);

        token.mint(owner, user, Amount::ZERO).await.unwrap();
        assert_eq!(token.total_supply().await, Amount::ZERO);
    }
}
