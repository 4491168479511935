//! CLI command implementations for stowage.
//!
//! - [`serve`] - Reference key-value service
//! - [`kv`] - One-shot get/put/delete against the configured store

pub mod kv;
pub mod serve;

use anyhow::Result;
use std::path::Path;
use tracing::warn;

use stowage::config::Config;

/// Load and validate the configuration at `path`, logging any warnings.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!(config = %path.display(), "{warning}");
    }
    Ok(config)
}
