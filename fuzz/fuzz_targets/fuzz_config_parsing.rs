//! Fuzz target for configuration parsing and validation.
//!
//! Run with: `cargo +nightly fuzz run fuzz_config_parsing`

#![no_main]

use libfuzzer_sys::fuzz_target;
use stowage::config::{BackendKind, Config};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = toml::from_str::<Config>(text) else {
        return;
    };

    if config.validate().is_ok() {
        // INVARIANT: a valid remote config always has an endpoint
        if config.store.backend == BackendKind::Remote {
            assert!(config.store.endpoint.is_some(), "accepted remote without endpoint");
        }

        // INVARIANT: valid store names are usable as namespaces
        assert!(
            stowage::server::validate_name(&config.store.name).is_ok(),
            "accepted store name: {:?}",
            config.store.name
        );
    }
});
