//! Value codec for the durable backend.
//!
//! Converts typed values to and from the opaque byte payloads stored by the
//! remote key-value service. The default [`JsonCodec`] produces
//! field-tagged JSON, which keeps payloads readable when inspecting the
//! service directly.

mod finite;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Direction of a failed codec operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecOp {
    Encode,
    Decode,
}

impl fmt::Display for CodecOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => f.write_str("encode"),
            Self::Decode => f.write_str("decode"),
        }
    }
}

/// Failure converting a value to or from its serialized payload.
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} value of type {type_name}: {source}")]
pub struct CodecError {
    op: CodecOp,
    type_name: &'static str,
    #[source]
    source: serde_json::Error,
}

impl CodecError {
    /// Create an encode failure for type `V`.
    pub fn encode<V: ?Sized>(source: serde_json::Error) -> Self {
        Self {
            op: CodecOp::Encode,
            type_name: std::any::type_name::<V>(),
            source,
        }
    }

    /// Create a decode failure for type `V`.
    pub fn decode<V: ?Sized>(source: serde_json::Error) -> Self {
        Self {
            op: CodecOp::Decode,
            type_name: std::any::type_name::<V>(),
            source,
        }
    }

    pub fn op(&self) -> CodecOp {
        self.op
    }

    /// Rust type name of the value being converted.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Bidirectional conversion between typed values and byte payloads.
///
/// Implementations must round-trip exactly: `decode(encode(v))` yields a
/// value equal to `v`. Decoding must fail outright on malformed, truncated
/// or structurally incompatible input rather than returning a partially
/// populated value.
pub trait Codec: Send + Sync + 'static {
    /// Serialize `value` into a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in the encoding.
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, CodecError>;

    /// Deserialize a payload into `V`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or does not match `V`.
    fn decode<V: DeserializeOwned>(&self, payload: &[u8]) -> Result<V, CodecError>;
}

/// JSON codec backed by `serde_json`.
///
/// Trailing bytes after the top-level value are rejected, so truncated or
/// concatenated payloads never decode. NaN and infinite floats have no JSON
/// representation and fail to encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        finite::check(value).map_err(CodecError::encode::<V>)?;
        serde_json::to_vec(value).map_err(CodecError::encode::<V>)
    }

    fn decode<V: DeserializeOwned>(&self, payload: &[u8]) -> Result<V, CodecError> {
        serde_json::from_slice(payload).map_err(CodecError::decode::<V>)
    }
}
