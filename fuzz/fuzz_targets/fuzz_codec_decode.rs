//! Fuzz target for payload decoding.
//!
//! Arbitrary bytes coming back from the service must decode or fail with a
//! decode error, never panic. Successful decodes must re-encode.
//!
//! Run with: `cargo +nightly fuzz run fuzz_codec_decode`

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stowage::codec::{Codec, CodecOp, JsonCodec};

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    id: u64,
    name: String,
    tags: Vec<String>,
    attrs: BTreeMap<String, i64>,
    parent: Option<Box<Record>>,
}

fn check<V: Serialize + serde::de::DeserializeOwned>(data: &[u8]) {
    match JsonCodec.decode::<V>(data) {
        Ok(value) => {
            // INVARIANT: anything decoded can be encoded again
            JsonCodec
                .encode(&value)
                .expect("decoded value failed to re-encode");
        },
        Err(err) => {
            // INVARIANT: failures are reported as decode errors
            assert_eq!(err.op(), CodecOp::Decode);
        },
    }
}

fuzz_target!(|data: &[u8]| {
    check::<serde_json::Value>(data);
    check::<Record>(data);
    check::<String>(data);
    check::<Vec<u32>>(data);
});
