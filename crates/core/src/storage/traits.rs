use async_trait::async_trait;

use super::{ConditionalPut, Item, ItemKey, Result};

/// Single-table key-value store with conditional and transactional writes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches the item at `key`.
    ///
    /// Returns [`StoreError::NotFound`](super::StoreError::NotFound) when no
    /// item exists.
    async fn get_by_key(&self, key: &ItemKey) -> Result<Item>;

    /// Writes one item, subject to its condition.
    async fn put(&self, put: ConditionalPut) -> Result<()>;

    /// Writes every item or none of them.
    ///
    /// If any condition fails the store rejects the whole batch with
    /// [`StoreError::TransactionCancelled`](super::StoreError::TransactionCancelled),
    /// carrying one reason per submitted item.
    async fn transact_put(&self, puts: Vec<ConditionalPut>) -> Result<()>;
}
