//! # Driver Runtime
//!
//! The shared state of one driver instance, built once at startup and
//! handed to the game loop and to the I/O side.

use std::sync::Arc;

use mud_core::{DriverSignals, MemoryReserve, ObjectRegistry};
use mud_net::ConnectionTable;

use crate::config::DriverConfig;
use crate::game_loop::DriverContext;

/// Handles to everything the game loop and its collaborators share.
///
/// Cloning is cheap and yields handles to the same instance.
#[derive(Clone, Debug)]
pub struct DriverRuntime {
    /// All live game objects.
    pub objects: Arc<ObjectRegistry>,
    /// All sessions.
    pub connections: Arc<ConnectionTable>,
    /// Wake-up and shutdown flags.
    pub signals: Arc<DriverSignals>,
    /// Out-of-memory early warning.
    pub reserve: Arc<MemoryReserve>,
}

impl DriverRuntime {
    /// Creates a runtime with a memory reserve of `reserve_size` bytes.
    ///
    /// The reserve is not allocated yet; call [`MemoryReserve::reserve`].
    #[must_use]
    pub fn new(reserve_size: u64) -> Self {
        Self::with_reserve(MemoryReserve::new(reserve_size))
    }

    /// Creates a runtime around an existing memory reserve.
    #[must_use]
    pub fn with_reserve(reserve: MemoryReserve) -> Self {
        Self {
            objects: Arc::new(ObjectRegistry::new()),
            connections: Arc::new(ConnectionTable::new()),
            signals: Arc::new(DriverSignals::new()),
            reserve: Arc::new(reserve),
        }
    }

    /// Creates a runtime for the given settings and allocates the memory
    /// reserve.
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        let runtime = Self::new(config.memory_reserve);
        runtime.reserve.reserve();
        runtime
    }

    /// Borrows the parts hooks may use.
    #[must_use]
    pub fn context(&self) -> DriverContext<'_> {
        DriverContext {
            objects: &self.objects,
            connections: &self.connections,
            signals: &self.signals,
        }
    }
}

impl Default for DriverRuntime {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let runtime = DriverRuntime::default();
        let other = runtime.clone();

        other.objects.create("alice").unwrap();
        assert!(runtime.objects.find_by_name("alice").is_some());

        other.signals.request_shutdown();
        assert!(runtime.signals.is_shutdown());
    }

    #[test]
    fn test_context_sees_runtime() {
        let runtime = DriverRuntime::default();
        let session = runtime.connections.accept();

        let ctx = runtime.context();
        assert_eq!(ctx.connections.find(session.id()).unwrap().id(), session.id());
    }
}
