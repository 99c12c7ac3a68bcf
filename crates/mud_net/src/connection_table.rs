//! # Connection Table
//!
//! All live sessions in one FIFO ring, polled round-robin.
//!
//! ## Fairness
//!
//! ```text
//!   front                                   back
//!   ┌────┬────┬────┬────┐   next_ready()   ┌────┬────┬────┬────┐
//!   │ A  │ B* │ C  │ D* │ ───────────────► │ C  │ D* │ A  │ B* │ ──► B
//!   └────┴────┴────┴────┘                  └────┴────┴────┴────┘
//!   (* = ready)
//! ```
//!
//! Every session examined is moved to the back, so the next call starts
//! where the previous one stopped: a session that always has input cannot
//! keep the others waiting. The first non-ready session seen acts as a
//! sentinel; meeting it again means the ring went full circle, which bounds
//! a call to one rotation.

use std::collections::VecDeque;
use std::sync::Arc;

use mud_core::SessionId;
use parking_lot::Mutex;

use crate::session::{Session, SessionState};

/// The set of sessions the game loop polls for work.
#[derive(Default)]
pub struct ConnectionTable {
    ring: Mutex<VecDeque<Arc<Session>>>,
}

impl ConnectionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for a freshly accepted connection and adds it.
    pub fn accept(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        self.add(Arc::clone(&session));
        session
    }

    /// Adds a session to the back of the ring.
    pub fn add(&self, session: Arc<Session>) {
        tracing::info!(session = %session.id(), "adding session");
        self.ring.lock().push_back(session);
    }

    /// Closes a session.
    ///
    /// Removal is logical: the session is purged from the ring by the next
    /// scan that passes over it.
    pub fn remove(&self, session: &Session) {
        session.close();
    }

    /// Returns true if any session has work pending. Does not reorder the
    /// ring.
    #[must_use]
    pub fn has_ready_work(&self) -> bool {
        self.ring.lock().iter().any(|s| s.is_ready())
    }

    /// Returns the next session with work pending, or `None` after one full
    /// rotation without a match.
    ///
    /// Closed sessions met on the way are dropped from the ring.
    pub fn next_ready(&self) -> Option<Arc<Session>> {
        let mut ring = self.ring.lock();
        let mut sentinel: Option<SessionId> = None;

        while let Some(session) = ring.pop_front() {
            if session.state() == SessionState::Closed {
                tracing::debug!(session = %session.id(), "purging closed session");
                continue;
            }
            if sentinel == Some(session.id()) {
                // Full circle: leave it where it was.
                ring.push_front(session);
                break;
            }

            ring.push_back(Arc::clone(&session));
            if session.is_ready() {
                tracing::debug!(session = %session.id(), "next session to process");
                return Some(session);
            }
            if sentinel.is_none() {
                sentinel = Some(session.id());
            }
        }

        tracing::trace!("no session pending for processing");
        None
    }

    /// Looks up a session still in the ring.
    #[must_use]
    pub fn find(&self, id: SessionId) -> Option<Arc<Session>> {
        self.ring.lock().iter().find(|s| s.id() == id).cloned()
    }

    /// Returns a snapshot of all sessions in the ring, closed ones included.
    #[must_use]
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.ring.lock().iter().cloned().collect()
    }

    /// Returns the number of sessions in the ring, including closed
    /// sessions not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    /// Returns true if the ring is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    /// Closes every session and empties the ring.
    ///
    /// Called when the game is being shut down and no further events will
    /// be processed. Returns the number of sessions closed by this call.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.ring.lock().drain(..).collect();
        tracing::info!(count = drained.len(), "shutting down all remaining connections");
        drained.iter().filter(|s| s.close()).count()
    }
}

impl std::fmt::Debug for ConnectionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTable")
            .field("sessions", &self.len())
            .finish()
    }
}
