use agora_types::{AccountAddress, Amount};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Why funds left a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferReason {
    Withdrawal,
    StrategyPull,
    PrizePayout,
    TicketRefund,
}

/// A completed outbound value transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvent {
    pub to: AccountAddress,
    pub amount: Amount,
    pub reason: TransferReason,
    pub timestamp: DateTime<Utc>,
}

/// External value-transfer collaborator.
///
/// A transfer is an atomic external call that can fail; callers treat any
/// error as a hard failure and roll back their own state.
#[async_trait]
pub trait FundsTransfer: Send + Sync {
    async fn transfer(
        &self,
        to: AccountAddress,
        amount: Amount,
        reason: TransferReason,
    ) -> Result<()>;
}

/// Transfer collaborator that records every payout; used by tests and
/// single-process deployments. Failure injection simulates a recipient
/// that rejects value.
pub struct RecordingTransfer {
    events: Arc<RwLock<Vec<TransferEvent>>>,
    failing: Arc<RwLock<bool>>,
}

impl Default for RecordingTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(false)),
        }
    }

    /// Make every subsequent transfer fail (or succeed again).
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    pub async fn events(&self) -> Vec<TransferEvent> {
        self.events.read().await.clone()
    }

    /// Total units paid out to an address across all recorded transfers.
    pub async fn total_paid(&self, to: AccountAddress) -> Amount {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.to == to)
            .map(|e| e.amount)
            .sum()
    }
}

#[async_trait]
impl FundsTransfer for RecordingTransfer {
    async fn transfer(
        &self,
        to: AccountAddress,
        amount: Amount,
        reason: TransferReason,
    ) -> Result<()> {
        if *self.failing.read().await {
            bail!("transfer rejected by recipient {}", to);
        }
        let mut events = self.events.write().await;
        events.push(TransferEvent {
            to,
            amount,
            reason,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
