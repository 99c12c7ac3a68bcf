//! # Sessions
//!
//! A session ties one network connection to (at most) one game object.
//!
//! ## State Machine
//!
//! ```text
//!            attach / first command
//!   ┌─────┐ ───────────────────────► ┌────────┐
//!   │ NEW │                          │ ACTIVE │
//!   └──┬──┘                          └───┬────┘
//!      │         connection lost         │
//!      └──────────────┐  ┌───────────────┘
//!                     ▼  ▼
//!              ┌─────────────────┐   close   ┌────────┐
//!              │ CONNECTION_LOST │ ────────► │ CLOSED │
//!              └─────────────────┘           └────────┘
//! ```
//!
//! Every state may go to CLOSED; CLOSED is terminal.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mud_core::{MudObject, ObjectRef, SessionId};
use parking_lot::Mutex;

/// Next session id to hand out. Ids are unique for the whole process.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// State of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// Freshly accepted, not yet associated with a game object.
    #[default]
    New = 0,
    /// Connected and in play.
    Active = 1,
    /// The peer went away; the game has not dealt with it yet.
    ConnectionLost = 2,
    /// Logically dead, waiting to be purged from the poller.
    Closed = 3,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::Active => "ACTIVE",
            Self::ConnectionLost => "CONNECTION_LOST",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

struct SessionInner {
    state: SessionState,
    /// The associated game object. Empty for a freshly accepted connection.
    object: ObjectRef,
    /// Display name, recomputed whenever the association changes.
    name: String,
    /// Command lines delivered by the I/O layer, oldest first.
    input: VecDeque<String>,
}

/// One network connection as seen by the game loop.
pub struct Session {
    id: SessionId,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Creates a new session in state [`SessionState::New`].
    #[must_use]
    pub fn new() -> Self {
        let id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            inner: Mutex::new(SessionInner {
                state: SessionState::New,
                object: ObjectRef::empty(),
                name: display_name(id, None),
                input: VecDeque::new(),
            }),
        }
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.lock().name.clone()
    }

    /// Returns the associated game object, if it is still alive.
    #[must_use]
    pub fn object(&self) -> Option<Arc<MudObject>> {
        self.inner.lock().object.resolve()
    }

    /// Returns true if the game loop has something to do for this session.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let inner = self.inner.lock();
        match inner.state {
            SessionState::New | SessionState::ConnectionLost => true,
            SessionState::Active => !inner.input.is_empty(),
            SessionState::Closed => false,
        }
    }

    /// Returns true if there are undelivered command lines.
    #[must_use]
    pub fn has_pending_input(&self) -> bool {
        !self.inner.lock().input.is_empty()
    }

    /// Queues a command line received from the connection.
    ///
    /// Input for a closed session is discarded.
    pub fn deliver(&self, line: impl Into<String>) {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Closed {
            inner.input.push_back(line.into());
        }
    }

    /// Takes the oldest pending command line.
    pub fn next_command(&self) -> Option<String> {
        self.inner.lock().input.pop_front()
    }

    /// Associates this session with a game object.
    ///
    /// Any previous association is dropped first. Does nothing on a closed
    /// session.
    pub fn attach(&self, object: &Arc<MudObject>) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Closed {
            return;
        }
        self.unlink(&mut inner);
        object.set_session(Some(self.id));
        inner.object = object.to_ref();
        inner.name = display_name(self.id, Some(object.name()));
        tracing::debug!(session = %self.id, object = %object.id(), "session attached");
    }

    /// Drops the association with the game object, on both sides.
    pub fn detach(&self) {
        let mut inner = self.inner.lock();
        self.unlink(&mut inner);
    }

    fn unlink(&self, inner: &mut SessionInner) {
        if let Some(object) = inner.object.resolve() {
            if object.session() == Some(self.id) {
                object.set_session(None);
            }
        }
        inner.object = ObjectRef::empty();
        inner.name = display_name(self.id, None);
    }

    /// Moves a new session into play. Returns false if it was not NEW.
    pub fn activate(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::New {
            inner.state = SessionState::Active;
            true
        } else {
            false
        }
    }

    /// Records that the peer went away. Returns false if already closed.
    pub fn mark_connection_lost(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Closed {
            return false;
        }
        inner.state = SessionState::ConnectionLost;
        tracing::debug!(session = %self.id, "connection lost");
        true
    }

    /// Closes the session: state CLOSED, object association dropped,
    /// pending input discarded.
    ///
    /// Returns false if it was already closed.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Closed {
            return false;
        }
        tracing::info!(session = %self.id, name = %inner.name, "closing session");
        inner.state = SessionState::Closed;
        inner.input.clear();
        self.unlink(&mut inner);
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        write!(f, "{} [state={}]", inner.name, inner.state)
    }
}

fn display_name(id: SessionId, object: Option<&str>) -> String {
    format!("Session {id} ({})", object.unwrap_or("-"))
}
