//! Client side of the external key-value service.
//!
//! The durable store talks to the service only through the [`KvService`]
//! trait, which exposes exactly the three logical remote operations it needs
//! (fetch, upsert, remove) plus namespace provisioning at construction time.
//!
//! - [`HttpKvService`] - reqwest-based client for the HTTP service served by
//!   `stowage serve`
//! - [`RetryConfig`] - backoff policy the HTTP client applies to transient
//!   failures

mod http;
mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use http::{ClientConfig, HttpKvService};
pub use retry::RetryConfig;

/// Namespace (bucket) options forwarded verbatim to the service.
///
/// None of these are interpreted by the storage layer; the service decides
/// what each option means. Unknown options go in `options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replication factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// Number of historical values kept per key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<u32>,
    /// Largest accepted payload, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value_size: Option<u64>,
    /// Total size limit of the namespace, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Failure reported by (or while reaching) the external service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// The key does not exist in the namespace.
    #[error("key not found")]
    KeyNotFound,

    /// The namespace does not exist.
    #[error("namespace '{0}' not found")]
    NamespaceNotFound(String),

    /// The service could not be reached or is temporarily failing.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request (quota, size limit, bad input).
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The service answered with something this client does not understand.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ServiceError {
    /// Returns true if the service reported that the key is absent.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound)
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Session with an external key-value service.
///
/// Implementations own the transport (connection pooling, timeouts, retry
/// policy). Every method is a single logical remote operation and must be
/// safe to call concurrently.
#[async_trait]
pub trait KvService: Send + Sync + 'static {
    /// Resolves the namespace, creating it with `config` if it does not exist.
    async fn ensure_namespace(&self, name: &str, config: &NamespaceConfig)
    -> Result<(), ServiceError>;

    /// Fetches the raw payload stored under `key`.
    ///
    /// Returns [`ServiceError::KeyNotFound`] if the key is absent.
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, ServiceError>;

    /// Stores `payload` under `key`, overwriting any previous value.
    async fn upsert(&self, namespace: &str, key: &str, payload: Vec<u8>)
    -> Result<(), ServiceError>;

    /// Removes `key`.
    ///
    /// Returns [`ServiceError::KeyNotFound`] if the key was absent.
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), ServiceError>;
}
