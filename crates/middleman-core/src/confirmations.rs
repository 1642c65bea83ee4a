use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use middleman_types::models::{ChannelId, UserId};

/// Identity of a pending close: who asked to close which channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseKey {
    pub channel: ChannelId,
    pub initiator: UserId,
}

/// Pending close requests awaiting their second click.
///
/// Entries never expire on their own; they are removed by a successful
/// confirmation or lost when the store is dropped.
#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    async fn insert(&self, key: CloseKey);

    async fn contains(&self, key: &CloseKey) -> bool;

    /// Returns whether the key was pending.
    async fn remove(&self, key: &CloseKey) -> bool;
}

/// Process-local store. Lost on restart.
#[derive(Default)]
pub struct MemoryConfirmations {
    /// key -> when the close was requested
    pending: RwLock<HashMap<CloseKey, DateTime<Utc>>>,
}

impl MemoryConfirmations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[async_trait]
impl ConfirmationStore for MemoryConfirmations {
    async fn insert(&self, key: CloseKey) {
        self.pending.write().await.insert(key, Utc::now());
    }

    async fn contains(&self, key: &CloseKey) -> bool {
        self.pending.read().await.contains_key(key)
    }

    async fn remove(&self, key: &CloseKey) -> bool {
        self.pending.write().await.remove(key).is_some()
    }
}
