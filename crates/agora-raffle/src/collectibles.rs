use crate::types::{Collectible, RarityTier};
use agora_types::{AccountAddress, RoundId, TokenId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Collectible mint registry.
///
/// Token ids are 1-indexed, monotonic and never reused. The metadata
/// reference is a blake3 content hash over (round, owner, token id).
pub struct CollectibleRegistry {
    next_id: Arc<RwLock<TokenId>>,
    tokens: Arc<RwLock<HashMap<TokenId, Collectible>>>,
}

impl Default for CollectibleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectibleRegistry {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(RwLock::new(1)),
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn mint(
        &self,
        owner: AccountAddress,
        rarity: RarityTier,
        round_id: RoundId,
    ) -> TokenId {
        let mut next_id = self.next_id.write().await;
        let id = *next_id;
        *next_id += 1;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&round_id.to_le_bytes());
        hasher.update(owner.as_bytes());
        hasher.update(&id.to_le_bytes());
        let content_hash = hex::encode(hasher.finalize().as_bytes());

        let collectible = Collectible {
            id,
            owner,
            rarity,
            round_id,
            content_hash: content_hash.clone(),
        };

        info!(
            token_id = id,
            owner = %owner,
            rarity = %rarity,
            round_id,
            content_hash = %&content_hash[..16],
            "🏅 Collectible minted"
        );

        self.tokens.write().await.insert(id, collectible);
        id
    }

    /// Metadata lookup by token id.
    pub async fn collectible(&self, id: TokenId) -> Option<Collectible> {
        self.tokens.read().await.get(&id).cloned()
    }

    pub async fn total_minted(&self) -> u64 {
        *self.next_id.read().await - 1
    }
}
