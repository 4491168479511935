//! Redb-backed namespace storage for the reference service.
//!
//! Three tables live in one database file:
//!
//! - `namespaces`: namespace name -> JSON-encoded [`NamespaceConfig`]
//! - `entries`: `"{namespace}/{key}"` -> raw payload
//! - `usage`: namespace name -> total payload bytes
//!
//! Namespace names never contain `/`, so the first `/` in an entry key
//! always separates namespace from key.

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use crate::constants::MAX_NAMESPACE_LEN;
use crate::remote::NamespaceConfig;

const NAMESPACES: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("namespaces");
const ENTRIES: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("entries");
const USAGE: TableDefinition<'static, &'static str, u64> = TableDefinition::new("usage");

/// Failures of namespace and entry operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("invalid namespace name: {0}")]
    InvalidName(String),

    #[error("namespace '{0}' not found")]
    NamespaceNotFound(String),

    #[error("key not found")]
    KeyNotFound,

    #[error("value of {size} bytes exceeds the limit of {limit} bytes")]
    ValueTooLarge { size: u64, limit: u64 },

    #[error("namespace would grow to {size} bytes, over its limit of {limit} bytes")]
    QuotaExceeded { size: u64, limit: u64 },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Checks that `name` can be used as a namespace.
///
/// # Errors
///
/// Returns [`DbError::InvalidName`] for empty names, `.` and `..`, names
/// containing `/`, or names longer than the maximum length.
pub fn validate_name(name: &str) -> std::result::Result<(), DbError> {
    if name.is_empty() {
        return Err(DbError::InvalidName("name cannot be empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(DbError::InvalidName(format!("'{name}' is reserved")));
    }
    if name.contains('/') {
        return Err(DbError::InvalidName(format!("'{name}' contains '/'")));
    }
    if name.len() > MAX_NAMESPACE_LEN {
        return Err(DbError::InvalidName(format!(
            "name is longer than {MAX_NAMESPACE_LEN} bytes"
        )));
    }
    Ok(())
}

fn entry_key(namespace: &str, key: &str) -> String {
    format!("{namespace}/{key}")
}

fn load_config<T>(table: &T, name: &str) -> Result<Option<NamespaceConfig>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table
        .get(name)
        .with_context(|| format!("Failed to read namespace '{name}'"))?
    {
        Some(guard) => {
            let config = serde_json::from_slice(guard.value())
                .with_context(|| format!("Failed to deserialize namespace '{name}'"))?;
            Ok(Some(config))
        },
        None => Ok(None),
    }
}

/// Persistent namespaces and entries.
///
/// `Clone` and shareable across threads; redb serializes write transactions.
/// Methods are blocking and meant to run under `spawn_blocking`.
#[derive(Clone)]
pub struct NamespaceDb {
    db: Arc<Database>,
}

impl NamespaceDb {
    /// Opens or creates a database at the given path.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created (permissions, disk full, etc.)
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Create tables up front so read transactions can always open them
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            write_txn
                .open_table(NAMESPACES)
                .context("Failed to initialize namespaces table")?;
            write_txn
                .open_table(ENTRIES)
                .context("Failed to initialize entries table")?;
            write_txn
                .open_table(USAGE)
                .context("Failed to initialize usage table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Returns the stored configuration of `name`, creating the namespace
    /// with `config` if it does not exist. The flag is true on creation.
    pub fn ensure_namespace(
        &self,
        name: &str,
        config: &NamespaceConfig,
    ) -> std::result::Result<(NamespaceConfig, bool), DbError> {
        validate_name(name)?;

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let outcome = {
            let mut namespaces = write_txn
                .open_table(NAMESPACES)
                .context("Failed to open namespaces table")?;

            if let Some(existing) = load_config(&namespaces, name)? {
                (existing, false)
            } else {
                let json =
                    serde_json::to_vec(config).context("Failed to serialize namespace config")?;
                namespaces
                    .insert(name, json.as_slice())
                    .with_context(|| format!("Failed to create namespace '{name}'"))?;

                let mut usage = write_txn
                    .open_table(USAGE)
                    .context("Failed to open usage table")?;
                usage
                    .insert(name, 0)
                    .with_context(|| format!("Failed to initialize usage of '{name}'"))?;

                (config.clone(), true)
            }
        };

        write_txn
            .commit()
            .context("Failed to commit namespace transaction")?;

        Ok(outcome)
    }

    /// Returns the configuration of an existing namespace.
    pub fn namespace(&self, name: &str) -> std::result::Result<NamespaceConfig, DbError> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let namespaces = read_txn
            .open_table(NAMESPACES)
            .context("Failed to open namespaces table")?;

        load_config(&namespaces, name)?.ok_or_else(|| DbError::NamespaceNotFound(name.to_string()))
    }

    /// Reads the payload stored under `key`.
    pub fn get(&self, namespace: &str, key: &str) -> std::result::Result<Vec<u8>, DbError> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;

        let namespaces = read_txn
            .open_table(NAMESPACES)
            .context("Failed to open namespaces table")?;
        if load_config(&namespaces, namespace)?.is_none() {
            return Err(DbError::NamespaceNotFound(namespace.to_string()));
        }

        let entries = read_txn
            .open_table(ENTRIES)
            .context("Failed to open entries table")?;
        let entry = entries
            .get(entry_key(namespace, key).as_str())
            .with_context(|| format!("Failed to read key '{key}'"))?;

        entry
            .map(|guard| guard.value().to_vec())
            .ok_or(DbError::KeyNotFound)
    }

    /// Stores `value` under `key`, enforcing the namespace's size limits.
    pub fn put(&self, namespace: &str, key: &str, value: &[u8]) -> std::result::Result<(), DbError> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        {
            let namespaces = write_txn
                .open_table(NAMESPACES)
                .context("Failed to open namespaces table")?;
            let config = load_config(&namespaces, namespace)?
                .ok_or_else(|| DbError::NamespaceNotFound(namespace.to_string()))?;

            let size = value.len() as u64;
            if let Some(limit) = config.max_value_size
                && size > limit
            {
                return Err(DbError::ValueTooLarge { size, limit });
            }

            let full_key = entry_key(namespace, key);
            let mut entries = write_txn
                .open_table(ENTRIES)
                .context("Failed to open entries table")?;
            let previous = entries
                .get(full_key.as_str())
                .with_context(|| format!("Failed to read key '{key}'"))?
                .map_or(0, |guard| guard.value().len() as u64);

            let mut usage = write_txn
                .open_table(USAGE)
                .context("Failed to open usage table")?;
            let used = usage
                .get(namespace)
                .with_context(|| format!("Failed to read usage of '{namespace}'"))?
                .map_or(0, |guard| guard.value());
            let new_usage = used.saturating_sub(previous) + size;

            if let Some(limit) = config.max_bytes
                && new_usage > limit
            {
                return Err(DbError::QuotaExceeded {
                    size: new_usage,
                    limit,
                });
            }

            entries
                .insert(full_key.as_str(), value)
                .with_context(|| format!("Failed to insert key '{key}'"))?;
            usage
                .insert(namespace, new_usage)
                .with_context(|| format!("Failed to update usage of '{namespace}'"))?;
        }

        write_txn
            .commit()
            .context("Failed to commit put transaction")?;

        Ok(())
    }

    /// Removes `key`.
    pub fn delete(&self, namespace: &str, key: &str) -> std::result::Result<(), DbError> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        {
            let namespaces = write_txn
                .open_table(NAMESPACES)
                .context("Failed to open namespaces table")?;
            if load_config(&namespaces, namespace)?.is_none() {
                return Err(DbError::NamespaceNotFound(namespace.to_string()));
            }

            let mut entries = write_txn
                .open_table(ENTRIES)
                .context("Failed to open entries table")?;
            let removed = entries
                .remove(entry_key(namespace, key).as_str())
                .with_context(|| format!("Failed to remove key '{key}'"))?
                .map(|guard| guard.value().len() as u64)
                .ok_or(DbError::KeyNotFound)?;

            let mut usage = write_txn
                .open_table(USAGE)
                .context("Failed to open usage table")?;
            let used = usage
                .get(namespace)
                .with_context(|| format!("Failed to read usage of '{namespace}'"))?
                .map_or(0, |guard| guard.value());
            usage
                .insert(namespace, used.saturating_sub(removed))
                .with_context(|| format!("Failed to update usage of '{namespace}'"))?;
        }

        write_txn
            .commit()
            .context("Failed to commit delete transaction")?;

        Ok(())
    }

    /// Total payload bytes stored in `namespace`.
    pub fn usage(&self, namespace: &str) -> std::result::Result<u64, DbError> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let usage = read_txn
            .open_table(USAGE)
            .context("Failed to open usage table")?;

        usage
            .get(namespace)
            .with_context(|| format!("Failed to read usage of '{namespace}'"))?
            .map(|guard| guard.value())
            .ok_or_else(|| DbError::NamespaceNotFound(namespace.to_string()))
    }
}
