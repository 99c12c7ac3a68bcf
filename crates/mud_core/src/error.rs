//! # Core Error Types
//!
//! Contract violations in the object lifecycle.

use thiserror::Error;

use crate::object::ObjectId;

/// Errors raised by the core kernel.
///
/// Every variant is a programmer error: the operation is aborted and
/// nothing is changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An object with this name is already live.
    #[error("object name already in use: '{0}'")]
    DuplicateName(String),

    /// Objects must have a non-empty name.
    #[error("object name must not be empty")]
    EmptyName,

    /// The object is live, but belongs to a different registry.
    #[error("object {0} is not managed by this registry")]
    UnknownObject(ObjectId),

    /// Physical release was requested for an object that is still live.
    #[error("object {0} released before it was destroyed")]
    NotDestroyed(ObjectId),

    /// Physical release was requested twice for the same object.
    #[error("object {0} was already released")]
    AlreadyReleased(ObjectId),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
