//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    CancellationCode, CancellationReason, ConditionalPut, Item, ItemKey, KeyValueStore, Result,
    StoreError,
};

/// In-memory store for testing.
///
/// Items live in a HashMap wrapped in `Arc<RwLock<_>>`, so clones share the
/// same data. Transactions run under a single write lock, which serializes
/// racing writers the same way the real store's conditional check does.
/// Expiry attributes are stored but never acted on.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    items: Arc<RwLock<HashMap<ItemKey, Item>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently stored.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Reads an item without going through the store contract.
    pub async fn peek(&self, key: &ItemKey) -> Option<Item> {
        self.items.read().await.get(key).cloned()
    }
}

fn key_of(item: &Item) -> Result<ItemKey> {
    ItemKey::of(item)
        .ok_or_else(|| StoreError::Serialization("item is missing its pk/sk attributes".into()))
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_by_key(&self, key: &ItemKey) -> Result<Item> {
        let items = self.items.read().await;
        items.get(key).cloned().ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn put(&self, put: ConditionalPut) -> Result<()> {
        let key = key_of(&put.item)?;
        let mut items = self.items.write().await;

        if let Some(condition) = &put.condition {
            if !condition.holds(items.get(&key)) {
                return Err(StoreError::ConditionalCheckFailed {
                    key: key.to_string(),
                });
            }
        }

        items.insert(key, put.item);
        Ok(())
    }

    async fn transact_put(&self, puts: Vec<ConditionalPut>) -> Result<()> {
        let keys = puts
            .iter()
            .map(|put| key_of(&put.item))
            .collect::<Result<Vec<_>>>()?;

        let mut items = self.items.write().await;

        let reasons: Vec<CancellationReason> = puts
            .iter()
            .zip(&keys)
            .map(|(put, key)| match &put.condition {
                Some(condition) if !condition.holds(items.get(key)) => {
                    CancellationReason::new(CancellationCode::ConditionalCheckFailed)
                        .with_message("The conditional request failed")
                }
                _ => CancellationReason::new(CancellationCode::None),
            })
            .collect();

        if reasons.iter().any(CancellationReason::is_condition_failure) {
            return Err(StoreError::TransactionCancelled { reasons });
        }

        for (put, key) in puts.into_iter().zip(keys) {
            items.insert(key, put.item);
        }
        Ok(())
    }
}
