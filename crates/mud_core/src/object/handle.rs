//! # Object References
//!
//! The preferred way to keep an object around. An [`ObjectRef`] never keeps
//! its target alive and stops resolving as soon as the target is either
//! freed or seen destroyed.

use std::fmt;
use std::sync::{Arc, Weak};

use super::entity::{MudObject, ObjectId};

/// Weak, self-expiring reference to a [`MudObject`].
///
/// Once [`get`](Self::get) has returned `None` it returns `None` forever:
/// the destroyed flag is monotonic, and a freed `Weak` never upgrades again.
#[derive(Clone, Default)]
pub struct ObjectRef {
    target: Option<Weak<MudObject>>,
    /// Kept so logs can still name a reference that has expired.
    id: ObjectId,
}

impl ObjectRef {
    /// Creates a reference to `object`.
    #[must_use]
    pub fn new(object: &Arc<MudObject>) -> Self {
        Self {
            target: Some(Arc::downgrade(object)),
            id: object.id(),
        }
    }

    /// Creates a reference which never resolves.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            target: None,
            id: ObjectId::INVALID,
        }
    }

    /// Returns the referenced object, or `None` if it no longer exists.
    #[must_use]
    pub fn get(&self) -> Option<Arc<MudObject>> {
        let object = self.target.as_ref()?.upgrade()?;
        if object.is_destroyed() {
            return None;
        }
        Some(object)
    }

    /// Returns the referenced object and drops the link once it expired.
    ///
    /// Same answer as [`get`](Self::get), but releases the weak allocation
    /// early for holders that have mutable access.
    pub fn resolve(&mut self) -> Option<Arc<MudObject>> {
        let object = self.get();
        if object.is_none() {
            self.target = None;
        }
        object
    }

    /// Returns true if the reference currently resolves.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.get().is_some()
    }

    /// Returns the id of the object this reference was created for.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
