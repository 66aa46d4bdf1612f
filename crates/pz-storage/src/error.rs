//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure while reading or writing `path`.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding a record or manifest failed.
    #[error("failed to encode {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted record is missing a field, fails to parse, or violates a
    /// zone invariant.
    #[error("malformed record {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// Record was written by an incompatible schema version.
    #[error("unsupported schema version {found} in {key} (expected {expected})")]
    UnsupportedVersion {
        key: String,
        found: u32,
        expected: u32,
    },

    /// The manifest lists a zone with no record.
    #[error("missing record for zone {0}")]
    MissingRecord(String),

    /// Writes are disabled (see `MemoryZoneStore::set_fail_writes`).
    #[error("store is read-only")]
    ReadOnly,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
