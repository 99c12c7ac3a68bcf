//! # Game Object Management
//!
//! Objects are created and tracked by the [`ObjectRegistry`]. Everything
//! else should hold on to them through an [`ObjectRef`], which expires by
//! itself once the object is destroyed.

mod entity;
mod handle;
mod registry;

pub use entity::{MudObject, ObjectId, SessionId};
pub use handle::ObjectRef;
pub use registry::ObjectRegistry;
