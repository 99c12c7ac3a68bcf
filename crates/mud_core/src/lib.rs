//! # MUD Core Kernel
//!
//! Lifecycle and signaling primitives for the MUD driver:
//! - Game objects with two-phase destruction
//! - Weak object references that expire on destruction
//! - An out-of-memory early warning reserve
//! - The wake/wait latch the game loop sleeps on
//!
//! ## Architecture Rules
//!
//! 1. **One turn at a time** - Game logic never runs concurrently with itself
//! 2. **Dead is dead** - A destroyed object is never found again
//! 3. **Release between ticks** - Resources of destroyed objects are freed
//!    only when nothing can be executing on their behalf
//!
//! ## Example
//!
//! ```rust
//! use mud_core::ObjectRegistry;
//!
//! let objects = ObjectRegistry::new();
//! let alice = objects.create("alice").unwrap();
//! let handle = alice.to_ref();
//!
//! assert!(objects.destroy(&alice).unwrap());
//! assert!(objects.find_by_name("alice").is_none());
//! assert!(handle.get().is_none());
//!
//! assert_eq!(objects.drain_destroyed(|_| {}), 1);
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod memory;
pub mod object;
pub mod sync;

pub use error::{CoreError, CoreResult};
pub use memory::MemoryReserve;
pub use object::{MudObject, ObjectId, ObjectRef, ObjectRegistry, SessionId};
pub use sync::DriverSignals;
