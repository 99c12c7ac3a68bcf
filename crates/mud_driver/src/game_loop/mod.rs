//! # Game Loop
//!
//! Run-to-completion main loop of the driver.
//!
//! ## One Tick
//!
//! ```text
//!   ┌──────────────┐ no work ┌───────────────┐
//!   │ ready work?  │ ──────► │ wait for wake │ ──► shutdown? ──► exit
//!   └──────┬───────┘         └───────┬───────┘
//!          │◄────────────────────────┘
//!          ▼
//!   1. memory reserve check   (OOM detection)
//!   2. one ready session      (new / command / connection lost)
//!   3. heartbeat due?         (housekeeping, then release destroyed objects)
//! ```
//!
//! Game logic never runs concurrently with itself: every hook is called from
//! the thread running [`GameLoop::run`]. The only other thread is the
//! heartbeat timer, which touches nothing but [`DriverSignals`].
//!
//! Destroyed objects are released only in step 3, after the session step has
//! returned, so a hook never sees an object vanish in the middle of its work.
//!
//! [`DriverSignals`]: mud_core::DriverSignals

mod hooks;
mod timer;

pub use hooks::{DriverContext, DriverHooks, GuestHooks};
pub use timer::{next_wait, HeartbeatTimer};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mud_net::{Session, SessionState};

use crate::config::DEFAULT_HEARTBEAT_MS;
use crate::error::DriverResult;
use crate::runtime::DriverRuntime;

/// Lifecycle of the game loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Created, not yet started.
    #[default]
    Idle,
    /// Processing ticks.
    Running,
    /// Shutdown requested; stopping the timer and closing sessions.
    Draining,
    /// Finished.
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Draining => "DRAINING",
            Self::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Counters kept by the game loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Sessions handed to a hook.
    pub sessions_processed: u64,
    /// Heartbeats run.
    pub heartbeats: u64,
    /// Destroyed objects released.
    pub objects_reclaimed: u64,
    /// Times the memory reserve was found gone.
    pub oom_detections: u64,
}

/// The main loop, driving `H` with work from a [`DriverRuntime`].
pub struct GameLoop<H: DriverHooks> {
    runtime: DriverRuntime,
    hooks: H,
    heartbeat_interval: Duration,
    state: LoopState,
    stats: LoopStats,
}

impl<H: DriverHooks> GameLoop<H> {
    /// Creates a loop with the default heartbeat interval.
    #[must_use]
    pub fn new(runtime: DriverRuntime, hooks: H) -> Self {
        Self {
            runtime,
            hooks,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_MS),
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Returns the counters so far.
    #[must_use]
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Returns the shared runtime.
    #[must_use]
    pub fn runtime(&self) -> &DriverRuntime {
        &self.runtime
    }

    /// Returns the hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Runs the loop until shutdown is requested through
    /// [`DriverSignals::request_shutdown`](mud_core::DriverSignals::request_shutdown).
    ///
    /// On the way out the heartbeat timer is stopped, the memory reserve is
    /// reset and every remaining session is closed.
    ///
    /// # Errors
    ///
    /// [`DriverError::ThreadSpawn`](crate::DriverError::ThreadSpawn) if the
    /// heartbeat thread can't be started. Hook errors are logged, not
    /// returned.
    pub fn run(&mut self) -> DriverResult<LoopStats> {
        tracing::info!(heartbeat_ms = self.heartbeat_interval.as_millis() as u64, "main loop start");
        let signals = Arc::clone(&self.runtime.signals);
        let mut timer = HeartbeatTimer::start(self.heartbeat_interval, Arc::clone(&signals))?;
        self.state = LoopState::Running;

        while !signals.is_shutdown() {
            if !self.runtime.connections.has_ready_work() {
                tracing::debug!("no work pending, waiting");
                signals.wait_for_wake();
                if signals.is_shutdown() {
                    break;
                }
            }
            self.tick();
        }

        self.state = LoopState::Draining;
        tracing::info!("main loop draining");
        timer.stop();
        self.runtime.reserve.reset();
        let closed = self.runtime.connections.shutdown();

        self.state = LoopState::Stopped;
        tracing::info!(
            ticks = self.stats.ticks,
            heartbeats = self.stats.heartbeats,
            sessions_closed = closed,
            "main loop end"
        );
        Ok(self.stats)
    }

    /// Executes one tick.
    ///
    /// Does not wait: with nothing to do and no heartbeat due, it returns
    /// straight away.
    pub fn tick(&mut self) {
        let started = Instant::now();
        self.stats.ticks += 1;
        tracing::debug!(tick = self.stats.ticks, "main loop tick");

        let runtime = &self.runtime;
        let ctx = runtime.context();

        if !runtime.reserve.is_available() {
            tracing::warn!("out of memory, initiating shutdown");
            self.stats.oom_detections += 1;
            runtime.reserve.reset();
            self.hooks.out_of_memory(&ctx);
        }

        if let Some(session) = runtime.connections.next_ready() {
            self.stats.sessions_processed += 1;
            if let Err(err) = dispatch(&mut self.hooks, &ctx, &session) {
                tracing::error!(session = %session.id(), error = %err, "error processing session");
            }
        }

        if runtime.signals.take_tick_due() {
            self.stats.heartbeats += 1;
            if let Err(err) = self.hooks.heartbeat(&ctx) {
                tracing::error!(error = %err, "error in heartbeat");
            }
            let hooks = &mut self.hooks;
            let released = runtime.objects.drain_destroyed(|object| hooks.release_object(object));
            self.stats.objects_reclaimed += released as u64;
        }

        tracing::debug!(elapsed_us = started.elapsed().as_micros() as u64, "loop executed");
    }
}

impl<H: DriverHooks> fmt::Debug for GameLoop<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLoop")
            .field("state", &self.state)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Hands one ready session to the matching hook.
fn dispatch<H: DriverHooks + ?Sized>(
    hooks: &mut H,
    ctx: &DriverContext<'_>,
    session: &Arc<Session>,
) -> DriverResult<()> {
    let object = session.object();
    tracing::debug!(session = ?session, "processing session");

    if session.state() == SessionState::ConnectionLost {
        return hooks.connection_lost(ctx, session, object.as_ref());
    }
    match object {
        Some(object) => hooks.execute_command(ctx, session, &object),
        None => {
            let result = hooks.new_connection(ctx, session);
            session.activate();
            result
        }
    }
}
