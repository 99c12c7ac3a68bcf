//! # Driver Hooks
//!
//! The seam between the game loop and the game. The loop decides *when*
//! something happens; the hooks decide *what* happens.

use std::sync::Arc;

use mud_core::{DriverSignals, MudObject, ObjectRegistry};
use mud_net::{ConnectionTable, Session};

use crate::error::DriverResult;
use crate::logging::GAME_LOG_TARGET;

/// What a hook can reach while the loop is running it.
#[derive(Clone, Copy)]
pub struct DriverContext<'a> {
    /// All live game objects.
    pub objects: &'a ObjectRegistry,
    /// All sessions polled by the loop.
    pub connections: &'a ConnectionTable,
    /// Wake-up and shutdown flags.
    pub signals: &'a DriverSignals,
}

/// Game logic called by the game loop.
///
/// Hooks run on the game loop thread, one at a time, and must return
/// promptly: a hook that blocks stalls the whole game. An error returned
/// by a hook is logged and the loop carries on.
pub trait DriverHooks {
    /// A session without a live object has work pending, usually a freshly
    /// accepted connection.
    ///
    /// If the session is still NEW when this returns, the loop moves it to
    /// ACTIVE.
    ///
    /// # Errors
    ///
    /// Any error is logged by the loop.
    fn new_connection(&mut self, ctx: &DriverContext<'_>, session: &Arc<Session>) -> DriverResult<()>;

    /// A session with a live object has input pending.
    ///
    /// # Errors
    ///
    /// Any error is logged by the loop.
    fn execute_command(
        &mut self,
        ctx: &DriverContext<'_>,
        session: &Arc<Session>,
        object: &Arc<MudObject>,
    ) -> DriverResult<()>;

    /// The peer of a session went away. Closes the session by default.
    ///
    /// # Errors
    ///
    /// Any error is logged by the loop.
    fn connection_lost(
        &mut self,
        ctx: &DriverContext<'_>,
        session: &Arc<Session>,
        _object: Option<&Arc<MudObject>>,
    ) -> DriverResult<()> {
        ctx.connections.remove(session);
        Ok(())
    }

    /// Periodic housekeeping, once per heartbeat.
    ///
    /// # Errors
    ///
    /// Any error is logged by the loop.
    fn heartbeat(&mut self, _ctx: &DriverContext<'_>) -> DriverResult<()> {
        Ok(())
    }

    /// Final release of a destroyed object, between ticks.
    fn release_object(&mut self, _object: &Arc<MudObject>) {}

    /// The memory reserve is gone. Called once per detection, after the
    /// reserve has been reset.
    fn out_of_memory(&mut self, _ctx: &DriverContext<'_>) {}
}

/// Placeholder game: every connection gets a guest object, commands are
/// logged.
///
/// Understands two commands: `quit` destroys the guest and closes the
/// session, `shutdown` stops the driver.
#[derive(Debug, Default)]
pub struct GuestHooks {
    /// Stop the driver after this many heartbeats. `0` runs until shutdown.
    heartbeat_limit: u64,
    heartbeats: u64,
}

impl GuestHooks {
    /// Creates hooks that run until shutdown is requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates hooks that request shutdown after `limit` heartbeats.
    #[must_use]
    pub fn with_heartbeat_limit(limit: u64) -> Self {
        Self {
            heartbeat_limit: limit,
            heartbeats: 0,
        }
    }
}

impl DriverHooks for GuestHooks {
    fn new_connection(&mut self, ctx: &DriverContext<'_>, session: &Arc<Session>) -> DriverResult<()> {
        let guest = ctx.objects.create(format!("guest{}", session.id().0))?;
        session.attach(&guest);
        tracing::info!(target: GAME_LOG_TARGET, session = %session.id(), object = %guest.id(), "guest logged in");
        Ok(())
    }

    fn execute_command(
        &mut self,
        ctx: &DriverContext<'_>,
        session: &Arc<Session>,
        object: &Arc<MudObject>,
    ) -> DriverResult<()> {
        let Some(line) = session.next_command() else {
            return Ok(());
        };
        match line.trim() {
            "quit" => {
                tracing::info!(target: GAME_LOG_TARGET, object = %object.id(), "guest quit");
                ctx.objects.destroy(object)?;
                ctx.connections.remove(session);
            }
            "shutdown" => ctx.signals.request_shutdown(),
            command => tracing::info!(target: GAME_LOG_TARGET, object = %object.id(), name = object.name(), command, "command"),
        }
        Ok(())
    }

    fn connection_lost(
        &mut self,
        ctx: &DriverContext<'_>,
        session: &Arc<Session>,
        object: Option<&Arc<MudObject>>,
    ) -> DriverResult<()> {
        if let Some(object) = object {
            ctx.objects.destroy(object)?;
        }
        ctx.connections.remove(session);
        Ok(())
    }

    fn heartbeat(&mut self, ctx: &DriverContext<'_>) -> DriverResult<()> {
        self.heartbeats += 1;
        tracing::trace!(heartbeat = self.heartbeats, "heartbeat");
        if self.heartbeat_limit > 0 && self.heartbeats >= self.heartbeat_limit {
            ctx.signals.request_shutdown();
        }
        Ok(())
    }

    fn release_object(&mut self, object: &Arc<MudObject>) {
        tracing::debug!(target: GAME_LOG_TARGET, object = %object.id(), name = object.name(), "object released");
    }

    fn out_of_memory(&mut self, ctx: &DriverContext<'_>) {
        tracing::warn!("out of memory, shutting down");
        ctx.signals.request_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_net::SessionState;

    struct Fixture {
        objects: ObjectRegistry,
        connections: ConnectionTable,
        signals: DriverSignals,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                objects: ObjectRegistry::new(),
                connections: ConnectionTable::new(),
                signals: DriverSignals::new(),
            }
        }

        fn ctx(&self) -> DriverContext<'_> {
            DriverContext {
                objects: &self.objects,
                connections: &self.connections,
                signals: &self.signals,
            }
        }
    }

    #[test]
    fn test_guest_login_and_quit() {
        let fx = Fixture::new();
        let mut hooks = GuestHooks::new();
        let session = fx.connections.accept();

        hooks.new_connection(&fx.ctx(), &session).unwrap();
        let guest = session.object().unwrap();
        assert_eq!(fx.objects.find(guest.id()).unwrap().id(), guest.id());

        session.deliver("quit");
        hooks.execute_command(&fx.ctx(), &session, &guest).unwrap();
        assert!(guest.is_destroyed());
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(fx.objects.pending_destroyed(), 1);
    }

    #[test]
    fn test_shutdown_command() {
        let fx = Fixture::new();
        let mut hooks = GuestHooks::new();
        let session = fx.connections.accept();
        hooks.new_connection(&fx.ctx(), &session).unwrap();
        let guest = session.object().unwrap();

        session.deliver("look");
        session.deliver("shutdown");
        hooks.execute_command(&fx.ctx(), &session, &guest).unwrap();
        assert!(!fx.signals.is_shutdown());
        hooks.execute_command(&fx.ctx(), &session, &guest).unwrap();
        assert!(fx.signals.is_shutdown());
    }

    #[test]
    fn test_connection_lost_destroys_guest() {
        let fx = Fixture::new();
        let mut hooks = GuestHooks::new();
        let session = fx.connections.accept();
        hooks.new_connection(&fx.ctx(), &session).unwrap();
        let guest = session.object().unwrap();

        session.mark_connection_lost();
        hooks.connection_lost(&fx.ctx(), &session, Some(&guest)).unwrap();
        assert!(guest.is_destroyed());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_heartbeat_limit() {
        let fx = Fixture::new();
        let mut hooks = GuestHooks::with_heartbeat_limit(3);

        hooks.heartbeat(&fx.ctx()).unwrap();
        hooks.heartbeat(&fx.ctx()).unwrap();
        assert!(!fx.signals.is_shutdown());
        hooks.heartbeat(&fx.ctx()).unwrap();
        assert!(fx.signals.is_shutdown());
    }

    /// Implements only the required hooks.
    struct Minimal;

    impl DriverHooks for Minimal {
        fn new_connection(&mut self, _: &DriverContext<'_>, _: &Arc<Session>) -> DriverResult<()> {
            Ok(())
        }

        fn execute_command(
            &mut self,
            _: &DriverContext<'_>,
            _: &Arc<Session>,
            _: &Arc<MudObject>,
        ) -> DriverResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_connection_lost_closes() {
        let fx = Fixture::new();
        let session = fx.connections.accept();
        let object = fx.objects.create("left_behind").unwrap();
        session.attach(&object);
        session.mark_connection_lost();

        Minimal.connection_lost(&fx.ctx(), &session, Some(&object)).unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        // The object is the game's business
        assert!(!object.is_destroyed());
    }

    #[test]
    fn test_default_hooks_leave_state_alone() {
        let fx = Fixture::new();
        let object = fx.objects.create("bystander").unwrap();

        Minimal.heartbeat(&fx.ctx()).unwrap();
        Minimal.release_object(&object);
        Minimal.out_of_memory(&fx.ctx());

        assert!(!fx.signals.is_shutdown());
        assert!(!object.is_destroyed());
        assert_eq!(fx.objects.len(), 1);
    }
}
