//! Registry error types.

use pz_storage::StorageError;
use pz_zone::ZoneError;
use thiserror::Error;

/// Registry error type.
///
/// Every variant except [`RegistryError::Persistence`] means the registry was
/// left exactly as it was before the call. A persistence failure means the
/// in-memory change was applied but did not reach storage; retry with
/// `persist_zone` / `persist_manifest` or undo the change.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A zone-level validation failed (bounds, name, root flags).
    #[error(transparent)]
    Validation(#[from] ZoneError),

    /// Another zone already uses this name (case-insensitive).
    #[error("a zone named {0:?} already exists")]
    DuplicateName(String),

    #[error("unknown parent zone {0:?}")]
    UnknownParent(String),

    #[error("unknown zone {0:?}")]
    UnknownZone(String),

    /// Reparenting would make a zone its own ancestor.
    #[error("cannot move zone {zone:?} under {parent:?}: {parent:?} is {zone:?} or one of its descendants")]
    CycleDetected { zone: String, parent: String },

    /// The root cannot be deleted, reparented, or edited.
    #[error("the root zone {0:?} cannot be changed this way")]
    RootImmutable(String),

    #[error("editor {0:?} is already editing a zone")]
    SessionActive(String),

    #[error("editor {0:?} is not editing a zone")]
    NoSession(String),

    /// Reading or writing storage failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

impl RegistryError {
    /// Whether this is a storage failure (in-memory state may be ahead of disk).
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
