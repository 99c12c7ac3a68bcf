//! # Game Objects
//!
//! A game object is little more than an identity plus a lifecycle:
//! - An id, unique for the lifetime of the registry that created it
//! - A name, unique among live objects
//! - A `destroyed` flag which only ever goes from `false` to `true`
//!
//! Destroying an object is split in two. The registry first makes it
//! *logically* dead (unreachable by lookup, flag set). Code which still
//! holds the object may keep reading it. The *physical* release happens
//! later, between two ticks of the game loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::handle::ObjectRef;
use crate::error::{CoreError, CoreResult};

/// Unique identifier for a game object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Id value for references no longer pointing at an actual object.
    pub const INVALID: Self = Self(0);

    /// Returns true if this is the invalid id.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a network session.
///
/// Defined here so that objects can record which session they are
/// connected to without this crate knowing about sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A game object.
///
/// Objects are only created by [`ObjectRegistry`](super::ObjectRegistry),
/// which hands them out as `Arc<MudObject>`.
pub struct MudObject {
    id: ObjectId,
    name: String,
    /// Logically destroyed, but possibly not yet released.
    destroyed: AtomicBool,
    /// Final release done; set at most once, and only after `destroyed`.
    released: AtomicBool,
    /// The session this object is connected to, if any.
    session: Mutex<Option<SessionId>>,
}

impl MudObject {
    pub(crate) fn new(id: ObjectId, name: String) -> Self {
        tracing::debug!(object = %id, name = %name, "created object");
        Self {
            id,
            name,
            destroyed: AtomicBool::new(false),
            released: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }

    /// Returns the object id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the object name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the object has been logically destroyed.
    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Returns true once the object has been physically released.
    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Creates a weak reference to this object.
    #[must_use]
    pub fn to_ref(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::new(self)
    }

    /// Returns the session this object is connected to.
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        *self.session.lock()
    }

    /// Connects this object to a session, or disconnects it with `None`.
    pub fn set_session(&self, session: Option<SessionId>) {
        *self.session.lock() = session;
    }

    /// Flips the destroyed flag. Returns false if it was already set.
    pub(crate) fn mark_destroyed(&self) -> bool {
        let first = !self.destroyed.swap(true, Ordering::AcqRel);
        if first {
            tracing::debug!(object = %self.id, name = %self.name, "destroyed object");
        }
        first
    }

    /// Physically releases the object.
    ///
    /// Drops the session link. The object value itself stays readable for
    /// anyone still holding an `Arc`, but no `ObjectRef` will resolve it.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotDestroyed`] if the object is still live,
    /// [`CoreError::AlreadyReleased`] if it was released before.
    pub fn release(&self) -> CoreResult<()> {
        if !self.is_destroyed() {
            return Err(CoreError::NotDestroyed(self.id));
        }
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(CoreError::AlreadyReleased(self.id));
        }
        self.set_session(None);
        tracing::trace!(object = %self.id, "released object");
        Ok(())
    }
}

impl PartialEq for MudObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MudObject {}

impl fmt::Debug for MudObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MudObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id() {
        assert!(ObjectId::INVALID.is_invalid());
        assert!(ObjectId::default().is_invalid());
        assert!(!ObjectId(7).is_invalid());
        assert_eq!(ObjectId(7).to_string(), "#7");
    }

    #[test]
    fn test_destroy_flag_is_monotonic() {
        let obj = MudObject::new(ObjectId(1), "foo".to_string());
        assert!(!obj.is_destroyed());

        assert!(obj.mark_destroyed());
        assert!(obj.is_destroyed());

        // Second flip reports no change
        assert!(!obj.mark_destroyed());
        assert!(obj.is_destroyed());
    }

    #[test]
    fn test_release_requires_destroy() {
        let obj = MudObject::new(ObjectId(1), "foo".to_string());
        assert_eq!(obj.release(), Err(CoreError::NotDestroyed(ObjectId(1))));
        assert!(!obj.is_released());

        obj.mark_destroyed();
        assert_eq!(obj.release(), Ok(()));
        assert!(obj.is_released());
        assert_eq!(obj.release(), Err(CoreError::AlreadyReleased(ObjectId(1))));
    }

    #[test]
    fn test_release_drops_session_link() {
        let obj = MudObject::new(ObjectId(3), "bar".to_string());
        obj.set_session(Some(SessionId(9)));
        assert_eq!(obj.session(), Some(SessionId(9)));

        obj.mark_destroyed();
        obj.release().unwrap();
        assert_eq!(obj.session(), None);
    }
}
