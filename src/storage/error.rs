//! Error types for storage operations.
//!
//! Every failure keeps its specific kind so callers can tell an absent key
//! from a codec failure from a backend outage without string matching.

use crate::codec::CodecError;
use crate::remote::ServiceError;
use std::fmt;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Why an operation was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The caller's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Fieldless discriminant of [`StorageError`], handy for matching and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Absent,
    Encode,
    Decode,
    Connection,
    Namespace,
    Backend,
    Cancelled,
}

/// Storage errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The key has no value.
    #[error("key not found: {key}")]
    Absent { key: String },

    /// The value could not be serialized; nothing was sent to the backend.
    #[error("failed to encode value for key '{key}'")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    /// The stored payload could not be turned back into a value.
    #[error("failed to decode value for key '{key}'")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    /// The external service could not be reached at construction time.
    #[error("failed to connect to '{endpoint}'")]
    Connection {
        endpoint: String,
        #[source]
        source: ServiceError,
    },

    /// The namespace could not be created or resolved at construction time.
    #[error("failed to resolve namespace '{name}'")]
    Namespace {
        name: String,
        #[source]
        source: ServiceError,
    },

    /// The external service failed while serving an operation.
    #[error("backend error for key '{key}'")]
    Backend {
        key: String,
        #[source]
        source: ServiceError,
    },

    /// The caller's context ended before the operation completed.
    #[error("operation on key '{key}' aborted: {reason}")]
    Cancelled { key: String, reason: CancelReason },
}

impl StorageError {
    /// Create an absent-key error.
    pub fn absent(key: impl Into<String>) -> Self {
        Self::Absent { key: key.into() }
    }

    /// Create a backend error.
    pub fn backend(key: impl Into<String>, source: ServiceError) -> Self {
        Self::Backend {
            key: key.into(),
            source,
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(key: impl Into<String>, reason: CancelReason) -> Self {
        Self::Cancelled {
            key: key.into(),
            reason,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Absent { .. } => ErrorKind::Absent,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Namespace { .. } => ErrorKind::Namespace,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Returns true if the key simply has no value.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }

    /// Returns true if the backend reported a transient failure.
    ///
    /// The stores themselves never retry an operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { source, .. } | Self::Connection { source, .. } => {
                source.is_transient()
            },
            _ => false,
        }
    }
}
