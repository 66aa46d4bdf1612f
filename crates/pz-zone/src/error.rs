//! Zone validation errors.

use thiserror::Error;

use crate::Flag;

/// Zone validation error type.
///
/// Every operation that returns one of these leaves the zone unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    /// The vertical band would end up with `floor > ceiling`.
    #[error("floor {floor} must not be above ceiling {ceiling}")]
    InvalidBounds { floor: i32, ceiling: i32 },

    /// The root zone must store a concrete state for every flag.
    #[error("the root zone cannot inherit flag {0}")]
    InheritOnRoot(Flag),

    /// The root zone has no parent.
    #[error("the root zone cannot be given a parent")]
    RootHasNoParent,

    /// Name is empty, too long, or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid zone name {0:?}")]
    InvalidName(String),
}

/// Result type for zone operations.
pub type ZoneResult<T> = Result<T, ZoneError>;
