//! # Object Registry
//!
//! Creates objects and tracks them by id and by name.
//!
//! ## Two-Phase Destruction
//!
//! ```text
//!   create()            destroy()                   drain_destroyed()
//!      │                    │                              │
//!      ▼                    ▼                              ▼
//!   ┌──────┐  lookup   ┌───────────┐  tick boundary  ┌──────────┐
//!   │ LIVE │ ────────► │ DESTROYED │ ──────────────► │ RELEASED │
//!   └──────┘  removed  └───────────┘  release hook   └──────────┘
//!              queued
//! ```
//!
//! An object may destroy itself from code it is running. Its state must stay
//! valid until that code returns, so the release is deferred to a point
//! between ticks where nothing can be executing on its behalf.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::entity::{MudObject, ObjectId};
use crate::error::{CoreError, CoreResult};

/// Next object id to hand out. Ids are unique for the whole process, across
/// all registries.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Registry state, guarded as a whole by one lock.
#[derive(Default)]
struct Tables {
    by_id: HashMap<ObjectId, Arc<MudObject>>,
    by_name: HashMap<String, Arc<MudObject>>,
    /// Logically destroyed objects awaiting release, oldest first.
    destroyed: VecDeque<Arc<MudObject>>,
    /// Most recently assigned id in this registry.
    last_id: ObjectId,
}

/// Owner of all live game objects.
///
/// Lookups never return a destroyed object: [`destroy`](Self::destroy)
/// removes it from both tables in the same critical section that sets
/// its flag. A registry only ever destroys objects it created.
#[derive(Default)]
pub struct ObjectRegistry {
    tables: Mutex<Tables>,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new object with the given name.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateName`] if a live object already has this name,
    /// [`CoreError::EmptyName`] if `name` is empty.
    pub fn create(&self, name: impl Into<String>) -> CoreResult<Arc<MudObject>> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::EmptyName);
        }

        let mut tables = self.tables.lock();
        if tables.by_name.contains_key(&name) {
            return Err(CoreError::DuplicateName(name));
        }

        let id = ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed));
        tables.last_id = id;
        let object = Arc::new(MudObject::new(id, name.clone()));
        tables.by_id.insert(id, Arc::clone(&object));
        tables.by_name.insert(name, Arc::clone(&object));

        Ok(object)
    }

    /// Logically destroys an object and queues it for release.
    ///
    /// Destroying an already destroyed object does nothing. Returns true if
    /// this call did the destruction.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownObject`] if the object is live but was not
    /// created by this registry. Nothing is changed.
    pub fn destroy(&self, object: &Arc<MudObject>) -> CoreResult<bool> {
        let mut tables = self.tables.lock();
        if object.is_destroyed() {
            return Ok(false);
        }
        let owned = tables
            .by_id
            .get(&object.id())
            .is_some_and(|held| Arc::ptr_eq(held, object));
        if !owned {
            return Err(CoreError::UnknownObject(object.id()));
        }
        Ok(Self::unlink(&mut tables, object))
    }

    /// Destroys the live object with the given name, if there is one.
    pub fn destroy_by_name(&self, name: &str) -> bool {
        let mut tables = self.tables.lock();
        match tables.by_name.get(name).cloned() {
            Some(object) => Self::unlink(&mut tables, &object),
            None => false,
        }
    }

    /// Flags an object of this registry as destroyed, removes it from the
    /// lookup tables and queues it for release.
    fn unlink(tables: &mut Tables, object: &Arc<MudObject>) -> bool {
        if !object.mark_destroyed() {
            return false;
        }
        tables.by_id.remove(&object.id());
        tables.by_name.remove(object.name());
        tables.destroyed.push_back(Arc::clone(object));
        true
    }

    /// Releases every object queued by [`destroy`](Self::destroy).
    ///
    /// `release` is called exactly once per object, in destruction order,
    /// after the object's own final release. Objects destroyed from within
    /// `release` are picked up by the same call. Returns the number of
    /// objects released.
    ///
    /// Only the game loop calls this, between ticks.
    pub fn drain_destroyed<F>(&self, mut release: F) -> usize
    where
        F: FnMut(&Arc<MudObject>),
    {
        let mut count = 0;
        // The lock is not held while `release` runs: it may call back in.
        while let Some(object) = self.next_destroyed() {
            if let Err(err) = object.release() {
                tracing::error!(object = %object.id(), error = %err, "skipping object in destruction queue");
                continue;
            }
            release(&object);
            count += 1;
        }

        if count > 0 {
            tracing::debug!(count, "released destroyed objects");
        }
        count
    }

    fn next_destroyed(&self) -> Option<Arc<MudObject>> {
        self.tables.lock().destroyed.pop_front()
    }

    /// Finds a live object by id.
    #[must_use]
    pub fn find(&self, id: ObjectId) -> Option<Arc<MudObject>> {
        self.tables.lock().by_id.get(&id).cloned()
    }

    /// Finds a live object by name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Arc<MudObject>> {
        self.tables.lock().by_name.get(name).cloned()
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.lock().by_id.len()
    }

    /// Returns true if there are no live objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of objects awaiting release.
    #[must_use]
    pub fn pending_destroyed(&self) -> usize {
        self.tables.lock().destroyed.len()
    }

    /// Returns the most recently assigned object id.
    #[must_use]
    pub fn last_id(&self) -> ObjectId {
        self.tables.lock().last_id
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.lock();
        f.debug_struct("ObjectRegistry")
            .field("live", &tables.by_id.len())
            .field("destroyed", &tables.destroyed.len())
            .field("last_id", &tables.last_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let objects = ObjectRegistry::new();
        assert!(objects.find(ObjectId(10)).is_none());
        assert!(objects.find_by_name("foo").is_none());
        assert_eq!(objects.pending_destroyed(), 0);
        assert!(objects.is_empty());
        assert!(objects.last_id().is_invalid());
    }

    #[test]
    fn test_object_lifecycle() {
        let objects = ObjectRegistry::new();

        let obj = objects.create("foo").unwrap();
        assert!(!obj.id().is_invalid());
        assert_eq!(objects.find(obj.id()).unwrap().id(), obj.id());
        assert_eq!(objects.find_by_name("foo").unwrap().id(), obj.id());
        assert_eq!(objects.pending_destroyed(), 0);

        assert!(objects.destroy(&obj).unwrap());
        assert!(objects.find(obj.id()).is_none());
        assert!(objects.find_by_name("foo").is_none());
        assert_eq!(objects.pending_destroyed(), 1);

        assert_eq!(objects.drain_destroyed(|_| {}), 1);
        assert_eq!(objects.pending_destroyed(), 0);
        assert!(obj.is_released());
    }

    #[test]
    fn test_ids_increase() {
        let objects = ObjectRegistry::new();
        let a = objects.create("a").unwrap();
        let b = objects.create("b").unwrap();
        objects.destroy(&a).unwrap();
        let c = objects.create("c").unwrap();
        assert!(a.id() < b.id());
        assert!(b.id() < c.id());
        assert_eq!(objects.last_id(), c.id());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let objects = ObjectRegistry::new();
        let first = objects.create("foo").unwrap();

        assert_eq!(
            objects.create("foo").unwrap_err(),
            CoreError::DuplicateName("foo".to_string())
        );
        assert_eq!(objects.len(), 1);

        // The name becomes free again once its holder is destroyed
        objects.destroy(&first).unwrap();
        let second = objects.create("foo").unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_empty_name_rejected() {
        let objects = ObjectRegistry::new();
        assert_eq!(objects.create("").unwrap_err(), CoreError::EmptyName);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let objects = ObjectRegistry::new();
        let obj = objects.create("foo").unwrap();

        assert!(objects.destroy(&obj).unwrap());
        assert!(!objects.destroy(&obj).unwrap());
        assert_eq!(objects.pending_destroyed(), 1);

        let mut released = Vec::new();
        objects.drain_destroyed(|o| released.push(o.id()));
        assert_eq!(released, vec![obj.id()]);

        // Destroying after release is still a no-op
        assert!(!objects.destroy(&obj).unwrap());
        assert_eq!(objects.pending_destroyed(), 0);
    }

    #[test]
    fn test_drain_in_destruction_order() {
        let objects = ObjectRegistry::new();
        let names = ["a", "b", "c", "d"];
        let created: Vec<_> = names.iter().map(|n| objects.create(*n).unwrap()).collect();

        for obj in created.iter().rev() {
            objects.destroy(obj).unwrap();
        }

        let mut order = Vec::new();
        let count = objects.drain_destroyed(|o| order.push(o.name().to_string()));
        assert_eq!(count, 4);
        assert_eq!(order, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_destroy_during_drain() {
        let objects = ObjectRegistry::new();
        let a = objects.create("a").unwrap();
        let b = objects.create("b").unwrap();
        objects.destroy(&a).unwrap();

        let mut released = Vec::new();
        let count = objects.drain_destroyed(|o| {
            released.push(o.id());
            if o.id() == a.id() {
                objects.destroy(&b).unwrap();
            }
        });

        assert_eq!(count, 2);
        assert_eq!(released, vec![a.id(), b.id()]);
        assert_eq!(objects.pending_destroyed(), 0);
    }

    #[test]
    fn test_lookup_never_returns_destroyed() {
        let objects = ObjectRegistry::new();
        let mut live = Vec::new();

        for round in 0..50u32 {
            let obj = objects.create(format!("obj{round}")).unwrap();
            live.push(obj);
            if round % 3 == 0 {
                let victim = live.remove(live.len() / 2);
                objects.destroy(&victim).unwrap();
            }

            for i in 0..=round {
                let name = format!("obj{i}");
                if let Some(found) = objects.find_by_name(&name) {
                    assert!(!found.is_destroyed());
                    assert!(!objects.find(found.id()).unwrap().is_destroyed());
                }
            }
        }
        assert_eq!(objects.len(), live.len());
    }

    #[test]
    fn test_ids_unique_across_registries() {
        let first = ObjectRegistry::new();
        let second = ObjectRegistry::new();
        let x = first.create("x").unwrap();
        let y = second.create("y").unwrap();

        assert_ne!(x.id(), y.id());
        assert!(second.find(x.id()).is_none());
        assert_eq!(second.last_id(), y.id());
    }

    #[test]
    fn test_destroy_foreign_object_rejected() {
        let first = ObjectRegistry::new();
        let second = ObjectRegistry::new();
        let x = first.create("x").unwrap();
        let y = second.create("y").unwrap();

        assert_eq!(second.destroy(&x), Err(CoreError::UnknownObject(x.id())));

        // Neither registry was touched
        assert!(!x.is_destroyed());
        assert!(!y.is_destroyed());
        assert_eq!(first.find_by_name("x").unwrap().id(), x.id());
        assert_eq!(second.find(y.id()).unwrap().id(), y.id());
        assert_eq!(second.find_by_name("y").unwrap().id(), y.id());
        assert_eq!(second.pending_destroyed(), 0);

        // The owner can still destroy it
        assert!(first.destroy(&x).unwrap());
        assert!(first.find_by_name("x").is_none());
        assert_eq!(first.pending_destroyed(), 1);
    }

    #[test]
    fn test_destroyed_foreign_object_is_noop() {
        let first = ObjectRegistry::new();
        let second = ObjectRegistry::new();
        let x = first.create("x").unwrap();
        first.destroy(&x).unwrap();

        assert_eq!(second.destroy(&x), Ok(false));
        assert_eq!(second.pending_destroyed(), 0);
        assert_eq!(first.pending_destroyed(), 1);
    }

    #[test]
    fn test_destroy_by_name() {
        let objects = ObjectRegistry::new();
        objects.create("foo").unwrap();
        assert!(objects.destroy_by_name("foo"));
        assert!(!objects.destroy_by_name("foo"));
        assert!(!objects.destroy_by_name("bar"));
    }
}
