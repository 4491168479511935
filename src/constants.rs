//! Shared defaults.

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "stowage.toml";

/// Store name used when the configuration does not name one.
pub const DEFAULT_STORE_NAME: &str = "default";

/// Listen address of `stowage serve`.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:9920";

/// Database file of `stowage serve`.
pub const DEFAULT_DATA_PATH: &str = "stowage.redb";

/// Longest namespace name the service accepts, in bytes.
pub const MAX_NAMESPACE_LEN: usize = 128;
