//! Typed key-value storage with pluggable backends.
//!
//! Callers program against the [`Storage`] trait and pick a backend once, at
//! construction time:
//!
//! - **VolatileStore**: in-process map, lost when dropped
//! - **DurableStore**: adapter over an external key-value service; values go
//!   through a [`Codec`](crate::codec::Codec) on the way in and out
//!
//! # Example
//!
//! ```ignore
//! use stowage::storage::{Context, Storage, VolatileStore};
//!
//! let mut store = VolatileStore::<String>::new();
//! let ctx = Context::background();
//! store.put(&ctx, "a", "1".to_string()).await?;
//! assert_eq!(store.get(&ctx, "a").await?, "1");
//! ```
//!
//! # Absence
//!
//! A missing key is always reported as [`StorageError::Absent`], never as a
//! default value. Use [`Storage::get_optional`] for get-or-default logic.

mod context;
mod durable;
mod error;
mod volatile;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use context::Context;
pub use durable::DurableStore;
pub use error::{CancelReason, ErrorKind, Result, StorageError};
pub use volatile::VolatileStore;

/// Single-key storage contract shared by every backend.
///
/// Mutating operations take `&mut self`: a store performs no locking of its
/// own, so callers sharing one across tasks must wrap it (for example in a
/// `tokio::sync::Mutex`).
#[async_trait]
pub trait Storage<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Returns the current value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Absent`] if the key has no value, or a
    /// backend-specific error if the lookup itself failed.
    async fn get(&self, ctx: &Context, key: &str) -> Result<V>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Repeating the same call leaves the same observable state.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be stored.
    async fn put(&mut self, ctx: &Context, key: &str, value: V) -> Result<()>;

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to remove the key.
    async fn delete(&mut self, ctx: &Context, key: &str) -> Result<()>;

    /// Like [`get`](Storage::get), but maps an absent key to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns every error except [`StorageError::Absent`].
    async fn get_optional(&self, ctx: &Context, key: &str) -> Result<Option<V>> {
        match self.get(ctx, key).await {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::Absent { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl<V, S> Storage<V> for Box<S>
where
    V: Send + 'static,
    S: Storage<V> + ?Sized,
{
    async fn get(&self, ctx: &Context, key: &str) -> Result<V> {
        (**self).get(ctx, key).await
    }

    async fn put(&mut self, ctx: &Context, key: &str, value: V) -> Result<()> {
        (**self).put(ctx, key, value).await
    }

    async fn delete(&mut self, ctx: &Context, key: &str) -> Result<()> {
        (**self).delete(ctx, key).await
    }
}
