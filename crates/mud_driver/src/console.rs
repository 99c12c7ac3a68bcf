//! # Console Connection
//!
//! Feeds lines from a reader (normally stdin) into one session, the way a
//! network reader thread would feed a socket's lines. End of input counts as
//! a lost connection.

use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mud_core::DriverSignals;
use mud_net::{ConnectionTable, Session, SessionState};

use crate::error::{DriverError, DriverResult};

/// Accepts a session for `reader` and starts the thread delivering its
/// lines.
///
/// The thread exits at end of input, on a read error, or once the session
/// is closed.
///
/// # Errors
///
/// [`DriverError::ThreadSpawn`] if the thread can't be created.
pub fn spawn<R>(
    reader: R,
    connections: &ConnectionTable,
    signals: Arc<DriverSignals>,
) -> DriverResult<(Arc<Session>, JoinHandle<()>)>
where
    R: BufRead + Send + 'static,
{
    let session = connections.accept();
    signals.signal();

    let remote = Arc::clone(&session);
    let handle = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || feed(reader, &remote, &signals))
        .map_err(|source| DriverError::ThreadSpawn {
            thread: "console",
            source,
        })?;
    Ok((session, handle))
}

fn feed<R: BufRead>(reader: R, session: &Session, signals: &DriverSignals) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if session.state() == SessionState::Closed {
                    return;
                }
                session.deliver(line);
                signals.signal();
            }
            Err(err) => {
                tracing::warn!(session = %session.id(), error = %err, "console read failed");
                break;
            }
        }
    }
    if session.mark_connection_lost() {
        signals.signal();
    }
}
