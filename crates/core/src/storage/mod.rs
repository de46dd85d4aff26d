mod error;
mod inmemory;
mod traits;
mod types;

pub use error::{format_reasons, CancellationCode, CancellationReason, Result, StoreError};
pub use inmemory::InMemoryStore;
pub use traits::KeyValueStore;
pub use types::{Attribute, ConditionalPut, Item, ItemKey, PutCondition, PK, SK};
