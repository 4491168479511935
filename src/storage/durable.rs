//! Durable storage backend over an external key-value service.
//!
//! The store keeps nothing locally. Each operation encodes or decodes through
//! the configured codec and issues one logical call to the service. Retries
//! and timeouts are the service client's business, not this adapter's.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Context, Result, Storage, StorageError};
use crate::codec::{Codec, JsonCodec};
use crate::remote::{ClientConfig, HttpKvService, KvService, NamespaceConfig};

/// Storage backed by a namespace of an external key-value service.
///
/// `V` is serialized with codec `C` (JSON by default) and sent to service
/// `S` (HTTP by default). The service handle is shared: clones of a
/// `DurableStore`, or several stores built from the same `Arc<S>`, reuse one
/// session.
///
/// # Example
///
/// ```ignore
/// use stowage::remote::NamespaceConfig;
/// use stowage::storage::{Context, DurableStore, Storage};
///
/// let mut store: DurableStore<Session> =
///     DurableStore::open("sessions", "http://127.0.0.1:9920", &NamespaceConfig::default()).await?;
/// store.put(&Context::background(), "session:42", session).await?;
/// ```
pub struct DurableStore<V, S = HttpKvService, C = JsonCodec> {
    name: String,
    service: Arc<S>,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V> DurableStore<V, HttpKvService, JsonCodec> {
    /// Connects to the HTTP service at `endpoint` and resolves (or creates)
    /// the namespace `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the service is unreachable and
    /// [`StorageError::Namespace`] if the namespace cannot be resolved.
    pub async fn open(
        name: impl Into<String>,
        endpoint: &str,
        namespace: &NamespaceConfig,
    ) -> Result<Self> {
        Self::open_with(name, endpoint, &ClientConfig::default(), namespace).await
    }

    /// Like [`open`](Self::open) with explicit client settings.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub async fn open_with(
        name: impl Into<String>,
        endpoint: &str,
        client: &ClientConfig,
        namespace: &NamespaceConfig,
    ) -> Result<Self> {
        let service = HttpKvService::connect(endpoint, client)
            .await
            .map_err(|source| StorageError::Connection {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Self::with_service(name, Arc::new(service), namespace).await
    }
}

impl<V, S: KvService> DurableStore<V, S, JsonCodec> {
    /// Builds a store on an existing service session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Namespace`] if the namespace cannot be
    /// created or resolved.
    pub async fn with_service(
        name: impl Into<String>,
        service: Arc<S>,
        namespace: &NamespaceConfig,
    ) -> Result<Self> {
        let name = name.into();
        service
            .ensure_namespace(&name, namespace)
            .await
            .map_err(|source| StorageError::Namespace {
                name: name.clone(),
                source,
            })?;

        info!(store = %name, "Durable store ready");
        Ok(Self {
            name,
            service,
            codec: JsonCodec,
            _value: PhantomData,
        })
    }
}

impl<V, S, C> DurableStore<V, S, C> {
    /// Replaces the codec used for payloads.
    pub fn with_codec<C2: Codec>(self, codec: C2) -> DurableStore<V, S, C2> {
        DurableStore {
            name: self.name,
            service: self.service,
            codec,
            _value: PhantomData,
        }
    }

    /// Name of the namespace this store reads and writes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }
}

impl<V, S, C: Clone> Clone for DurableStore<V, S, C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            service: Arc::clone(&self.service),
            codec: self.codec.clone(),
            _value: PhantomData,
        }
    }
}

impl<V, S, C> fmt::Debug for DurableStore<V, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableStore")
            .field("name", &self.name)
            .field("value", &std::any::type_name::<V>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<V, S, C> Storage<V> for DurableStore<V, S, C>
where
    V: Serialize + DeserializeOwned + Send + 'static,
    S: KvService,
    C: Codec,
{
    async fn get(&self, ctx: &Context, key: &str) -> Result<V> {
        let payload = ctx
            .run(key, async {
                self.service
                    .fetch(&self.name, key)
                    .await
                    .map_err(|source| {
                        if source.is_key_not_found() {
                            StorageError::absent(key)
                        } else {
                            StorageError::backend(key, source)
                        }
                    })
            })
            .await?;

        debug!(store = %self.name, key, bytes = payload.len(), "get");
        self.codec
            .decode(&payload)
            .map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            })
    }

    async fn put(&mut self, ctx: &Context, key: &str, value: V) -> Result<()> {
        let payload = self
            .codec
            .encode(&value)
            .map_err(|source| StorageError::Encode {
                key: key.to_string(),
                source,
            })?;
        drop(value);

        let bytes = payload.len();
        ctx.run(key, async {
            self.service
                .upsert(&self.name, key, payload)
                .await
                .map_err(|source| StorageError::backend(key, source))
        })
        .await?;

        debug!(store = %self.name, key, bytes, "put");
        Ok(())
    }

    async fn delete(&mut self, ctx: &Context, key: &str) -> Result<()> {
        ctx.run(key, async {
            match self.service.remove(&self.name, key).await {
                Ok(()) => Ok(()),
                Err(source) if source.is_key_not_found() => Ok(()),
                Err(source) => Err(StorageError::backend(key, source)),
            }
        })
        .await?;

        debug!(store = %self.name, key, "delete");
        Ok(())
    }
}
