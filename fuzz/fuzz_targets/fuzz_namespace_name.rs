//! Fuzz target for namespace name validation.
//!
//! Run with: `cargo +nightly fuzz run fuzz_namespace_name`

#![no_main]

use libfuzzer_sys::fuzz_target;
use stowage::constants::MAX_NAMESPACE_LEN;
use stowage::server::validate_name;

fuzz_target!(|name: &str| {
    if validate_name(name).is_ok() {
        // INVARIANT: accepted names cannot escape the entry key prefix
        assert!(!name.contains('/'), "accepted separator: {name:?}");
        assert!(name != "." && name != "..", "accepted dot name: {name:?}");

        // INVARIANT: bounded length
        assert!(!name.is_empty() && name.len() <= MAX_NAMESPACE_LEN);
    }
});
