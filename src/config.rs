//! Configuration types for stowage.
//!
//! Loads store and service settings from a TOML file:
//!
//! - [`Config`] - Root configuration struct
//! - [`StoreConfig`] - Which backend to build and how to reach it
//! - [`ServerConfig`] - Settings for `stowage serve`
//!
//! ```toml
//! [store]
//! name = "sessions"
//! backend = "remote"
//! endpoint = "http://127.0.0.1:9920"
//!
//! [store.namespace]
//! history = 1
//! max_value_size = 1048576
//!
//! [store.client]
//! request_timeout_ms = 2000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::remote::{ClientConfig, NamespaceConfig};
use crate::server::{DbError, validate_name};
use crate::storage::{self, DurableStore, Storage, VolatileStore};

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// stowage.toml configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Backend selected for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process map; contents are lost on exit.
    #[default]
    Memory,
    /// Namespace on a remote key-value service.
    Remote,
}

/// Store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub name: String,
    #[serde(default)]
    pub backend: BackendKind,
    /// Service URL, required for the remote backend.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub namespace: NamespaceConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_store_name(),
            backend: BackendKind::default(),
            endpoint: None,
            namespace: NamespaceConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

/// Settings for the reference key-value service.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Address for the Prometheus scrape endpoint; disabled when unset.
    #[serde(default)]
    pub metrics_listen: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_path: default_data_path(),
            metrics_listen: None,
        }
    }
}

fn default_store_name() -> String {
    constants::DEFAULT_STORE_NAME.to_string()
}

fn default_listen() -> String {
    constants::DEFAULT_LISTEN.to_string()
}

fn default_data_path() -> PathBuf {
    PathBuf::from(constants::DEFAULT_DATA_PATH)
}

impl Config {
    /// Load configuration from stowage.toml in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if stowage.toml cannot be read or contains invalid TOML.
    pub fn load() -> Result<Self> {
        Self::load_from(constants::DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields are unknown or have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Like [`load_from`](Self::load_from), but a missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Empty or malformed store name
    /// - Remote backend without a valid http(s) endpoint
    /// - Zero timeouts or size limits
    /// - Unparseable listen addresses
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Store
        let store = &self.store;
        match validate_name(&store.name) {
            Ok(()) => {},
            Err(DbError::InvalidName(reason)) => {
                errors.push(format!("store.name is invalid: {reason}"));
            },
            Err(e) => errors.push(format!("store.name: {e}")),
        }

        match (store.backend, &store.endpoint) {
            (BackendKind::Remote, None) => {
                errors.push("store.endpoint is required when backend = \"remote\"".to_string());
            },
            (BackendKind::Remote, Some(endpoint)) => match url::Url::parse(endpoint) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {},
                Ok(url) => errors.push(format!(
                    "store.endpoint must use http or https (got scheme '{}')",
                    url.scheme()
                )),
                Err(e) => errors.push(format!("store.endpoint is not a valid URL: {e}")),
            },
            (BackendKind::Memory, Some(endpoint)) => warnings.push(format!(
                "store.endpoint '{endpoint}' is ignored by the memory backend"
            )),
            (BackendKind::Memory, None) => {},
        }

        if store.client.request_timeout_ms == 0 {
            errors.push("store.client.request_timeout_ms cannot be 0".to_string());
        }
        if store.client.connect_timeout_ms == 0 {
            errors.push("store.client.connect_timeout_ms cannot be 0".to_string());
        }
        if store.namespace.max_value_size == Some(0) {
            errors.push("store.namespace.max_value_size cannot be 0".to_string());
        }

        // 2. Server
        if self.server.listen.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "server.listen is not a socket address (got: '{}')",
                self.server.listen
            ));
        }
        if let Some(metrics) = &self.server.metrics_listen
            && metrics.parse::<SocketAddr>().is_err()
        {
            errors.push(format!(
                "server.metrics_listen is not a socket address (got: '{metrics}')"
            ));
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}

impl StoreConfig {
    /// Builds the configured backend behind the storage contract.
    ///
    /// The backend is fixed for the lifetime of the returned store.
    ///
    /// # Errors
    ///
    /// For the remote backend, returns
    /// [`StorageError::Connection`](crate::storage::StorageError::Connection) or
    /// [`StorageError::Namespace`](crate::storage::StorageError::Namespace) if the service cannot be reached or the
    /// namespace cannot be resolved.
    pub async fn open<V>(&self) -> storage::Result<Box<dyn Storage<V>>>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        match self.backend {
            BackendKind::Memory => Ok(Box::new(VolatileStore::<V>::new())),
            BackendKind::Remote => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                let store = DurableStore::<V>::open_with(
                    self.name.clone(),
                    endpoint,
                    &self.client,
                    &self.namespace,
                )
                .await?;
                Ok(Box::new(store))
            },
        }
    }
}
