use agora_types::{AccountAddress, Amount};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Direction of a vault ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerDirection {
    Deposit,
    Withdrawal,
}

/// One historical deposit or withdrawal, insertion order significant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account: AccountAddress,
    pub amount: Amount,
    pub direction: LedgerDirection,
    pub timestamp: DateTime<Utc>,
}

/// Backing store for the vault's pooled balance and per-account histories.
///
/// `begin_transaction`/`commit_transaction`/`rollback_transaction` bracket
/// multi-step mutations so a failed external transfer leaves no partial
/// state behind.
#[async_trait]
pub trait TreasuryStorage: Send + Sync {
    async fn total_assets(&self) -> Result<Amount>;
    async fn set_total_assets(&self, total: Amount) -> Result<()>;

    async fn append_entry(&self, entry: LedgerEntry) -> Result<()>;
    async fn history(
        &self,
        account: AccountAddress,
        direction: LedgerDirection,
    ) -> Result<Vec<LedgerEntry>>;

    /// Paginated history query, newest entries last (insertion order).
    /// Returns the page and the offset of the next page, if any.
    async fn history_paginated(
        &self,
        account: AccountAddress,
        direction: LedgerDirection,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<LedgerEntry>, Option<usize>)>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;
}

type Snapshot = Option<(Amount, usize)>;

/// In-memory storage used by tests and single-process deployments
pub struct MemoryStorage {
    total: Arc<RwLock<Amount>>,
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    // (total, entry count) at begin_transaction; entries are append-only,
    // so rollback truncates back to the recorded length
    snapshot: Arc<RwLock<Snapshot>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            total: Arc::new(RwLock::new(Amount::ZERO)),
            entries: Arc::new(RwLock::new(Vec::new())),
            snapshot: Arc::new(RwLock::new(None)),
        }
    }
}

#[async_trait]
impl TreasuryStorage for MemoryStorage {
    async fn total_assets(&self) -> Result<Amount> {
        Ok(*self.total.read().await)
    }

    async fn set_total_assets(&self, total: Amount) -> Result<()> {
        let mut current = self.total.write().await;
        if *current != total {
            info!(
                total_before = current.to_units(),
                total_after = total.to_units(),
                storage_type = "memory",
                "💾 Vault total assets stored"
            );
        }
        *current = total;
        Ok(())
    }

    async fn append_entry(&self, entry: LedgerEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        info!(
            account = %entry.account,
            amount = entry.amount.to_units(),
            direction = ?entry.direction,
            history_len = entries.len() + 1,
            storage_type = "memory",
            "📦 Ledger entry recorded"
        );
        entries.push(entry);
        Ok(())
    }

    async fn history(
        &self,
        account: AccountAddress,
        direction: LedgerDirection,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account == account && e.direction == direction)
            .cloned()
            .collect())
    }

    async fn history_paginated(
        &self,
        account: AccountAddress,
        direction: LedgerDirection,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<LedgerEntry>, Option<usize>)> {
        let entries = self.entries.read().await;
        let filtered: Vec<LedgerEntry> = entries
            .iter()
            .filter(|e| e.account == account && e.direction == direction)
            .cloned()
            .collect();

        let page: Vec<LedgerEntry> = filtered.iter().skip(offset).take(limit).cloned().collect();
        let next_offset = if offset + page.len() < filtered.len() {
            Some(offset + page.len())
        } else {
            None
        };
        Ok((page, next_offset))
    }

    async fn begin_transaction(&self) -> Result<()> {
        let total = self.total.read().await;
        let entries = self.entries.read().await;
        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some((*total, entries.len()));
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = None;
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if let Some((total, entry_len)) = snapshot.take() {
            let mut current_total = self.total.write().await;
            let mut entries = self.entries.write().await;
            *current_total = total;
            entries.truncate(entry_len);
            info!(
                restored_total = total.to_units(),
                restored_entries = entry_len,
                storage_type = "memory",
                "❌ Treasury transaction rolled back"
            );
        }
        Ok(())
    }
}
