//! In-process volatile storage backend.
//!
//! Keeps values in a plain `HashMap`. Nothing survives the store being
//! dropped, and there is no expiry or capacity bound.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use super::{Context, Result, Storage, StorageError};

/// In-memory key-value store holding values of type `V`.
///
/// Values are stored as-is (no serialization) and returned by clone.
///
/// # Thread Safety
///
/// `VolatileStore` does no internal locking. Mutation needs `&mut self`, so
/// sharing one store between tasks requires an external lock.
///
/// # Example
///
/// ```ignore
/// use stowage::storage::{Context, Storage, VolatileStore};
///
/// let mut store = VolatileStore::new();
/// store.put(&Context::background(), "key", 1u32).await?;
/// ```
pub struct VolatileStore<V> {
    items: HashMap<String, V>,
}

impl<V> VolatileStore<V> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Returns the number of entries in the store.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }
}

impl<V> Default for VolatileStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for VolatileStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolatileStore")
            .field("len", &self.items.len())
            .finish()
    }
}

// Never suspends, so the context is not consulted.
#[async_trait]
impl<V> Storage<V> for VolatileStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, _ctx: &Context, key: &str) -> Result<V> {
        self.items
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::absent(key))
    }

    async fn put(&mut self, _ctx: &Context, key: &str, value: V) -> Result<()> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&mut self, _ctx: &Context, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}
