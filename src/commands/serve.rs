//! `stowage serve` - run the reference key-value service.

use anyhow::Result;
use std::path::{Path, PathBuf};

use stowage::server;

/// Command-line values taking precedence over `[server]`.
#[derive(Debug, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub data: Option<PathBuf>,
    pub metrics_listen: Option<String>,
}

pub async fn execute(config_path: &Path, overrides: Overrides) -> Result<()> {
    let mut config = super::load_config(config_path)?;

    if let Some(listen) = overrides.listen {
        config.server.listen = listen;
    }
    if let Some(data) = overrides.data {
        config.server.data_path = data;
    }
    if overrides.metrics_listen.is_some() {
        config.server.metrics_listen = overrides.metrics_listen;
    }

    // Overrides bypass load-time validation, so check again.
    config.validate()?;
    server::serve(&config.server).await
}
