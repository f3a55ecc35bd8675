use agora_types::{AccountAddress, RequestId};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outbound randomness request envelope.
///
/// The oracle returns an opaque request id synchronously; the random value
/// arrives later through the module's `fulfill_randomness` callback, invoked
/// by the oracle's dispatcher address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub oracle_endpoint: u64,
    pub requester: AccountAddress,
    pub sponsor: AccountAddress,
    pub callback: AccountAddress,
    pub callback_method: String,
    pub params: Vec<u8>,
}

/// Asynchronous randomness oracle collaborator
#[async_trait]
pub trait RandomnessSource: Send + Sync {
    /// Submit a request, returning its correlation id.
    async fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId>;
}

/// Decode the oracle payload into a single unsigned integer
/// (little-endian, first 8 bytes).
pub fn decode_random_value(data: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = data.get(..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// Oracle stub that assigns sequential request ids and records requests;
/// tests fulfill the callback themselves with a chosen value.
pub struct CountingOracle {
    next_id: Arc<RwLock<RequestId>>,
    requests: Arc<RwLock<Vec<RandomnessRequest>>>,
}

impl Default for CountingOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingOracle {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(RwLock::new(1)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn requests(&self) -> Vec<RandomnessRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl RandomnessSource for CountingOracle {
    async fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId> {
        let mut next_id = self.next_id.write().await;
        let id = *next_id;
        *next_id += 1;
        self.requests.write().await.push(request);
        Ok(id)
    }
}
