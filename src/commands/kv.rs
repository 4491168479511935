//! `stowage get|put|delete` - single operations against the configured store.
//!
//! Values are arbitrary JSON documents.

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use stowage::config::{BackendKind, StoreConfig};
use stowage::storage::{Context, Storage};

/// Options shared by the key commands.
#[derive(Debug, Clone, Args)]
pub struct OpOptions {
    /// Abort the operation after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl OpOptions {
    fn context(&self) -> Context {
        match self.timeout_ms {
            Some(ms) => Context::with_timeout(Duration::from_millis(ms)),
            None => Context::background(),
        }
    }
}

async fn open_store(config_path: &Path) -> Result<Box<dyn Storage<Value>>> {
    let config = super::load_config(config_path)?;
    let store_config: &StoreConfig = &config.store;

    if store_config.backend == BackendKind::Memory {
        warn!("Memory backend selected; data does not outlive this command");
    }

    let store = store_config
        .open::<Value>()
        .await
        .with_context(|| format!("Failed to open store '{}'", store_config.name))?;
    debug!(store = %store_config.name, "Store opened");
    Ok(store)
}

pub async fn get(config_path: &Path, key: &str, opts: &OpOptions) -> Result<()> {
    let store = open_store(config_path).await?;
    let ctx = opts.context();

    match store.get_optional(&ctx, key).await? {
        Some(value) => {
            let rendered = serde_json::to_string_pretty(&value)
                .context("Failed to render value as JSON")?;
            println!("{rendered}");
            Ok(())
        },
        None => anyhow::bail!("Key '{key}' not found"),
    }
}

pub async fn put(config_path: &Path, key: &str, raw: &str, opts: &OpOptions) -> Result<()> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("Value is not valid JSON: {raw}"))?;

    let mut store = open_store(config_path).await?;
    store.put(&opts.context(), key, value).await?;
    debug!(key, "Stored");
    Ok(())
}

pub async fn delete(config_path: &Path, key: &str, opts: &OpOptions) -> Result<()> {
    let mut store = open_store(config_path).await?;
    store.delete(&opts.context(), key).await?;
    debug!(key, "Deleted");
    Ok(())
}
