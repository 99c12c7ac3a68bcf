//! # Driver Signals
//!
//! Wake-up latch for the game loop plus the flags it consults on waking.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct SignalState {
    /// The game loop has been signaled and has not consumed it yet.
    wake: bool,
    /// The heartbeat timer fired since the flag was last cleared.
    tick_due: bool,
    /// The game is being shut down.
    shutdown: bool,
}

/// Cross-thread signaling between the game loop and everything that wants
/// its attention.
///
/// The `wake` latch, not the condition variable notification, is the source
/// of truth: a signal raised before the loop starts waiting is not lost.
///
/// ```rust
/// use mud_core::DriverSignals;
///
/// let signals = DriverSignals::new();
/// signals.signal();
/// signals.wait_for_wake(); // returns at once, the latch was already set
/// ```
#[derive(Debug, Default)]
pub struct DriverSignals {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl DriverSignals {
    /// Creates a new signal set with all flags cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tells the game loop that something needs its attention.
    ///
    /// Never blocks beyond the short critical section. Safe to call from
    /// any thread, including the game loop itself.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        tracing::trace!(pending = state.wake, "signaling game loop");
        state.wake = true;
        self.condvar.notify_one();
    }

    /// Blocks until signaled, then clears the latch.
    pub fn wait_for_wake(&self) {
        let mut state = self.state.lock();
        tracing::trace!(pending = state.wake, "game loop waiting for signal");
        while !state.wake {
            self.condvar.wait(&mut state);
        }
        state.wake = false;
    }

    /// Returns true if a signal is pending.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.state.lock().wake
    }

    /// Returns true if the heartbeat fired since the flag was last cleared.
    #[must_use]
    pub fn is_tick_due(&self) -> bool {
        self.state.lock().tick_due
    }

    /// Sets or clears the heartbeat flag.
    pub fn set_tick_due(&self, due: bool) {
        self.state.lock().tick_due = due;
    }

    /// Clears the heartbeat flag, returning whether it was set.
    pub fn take_tick_due(&self) -> bool {
        std::mem::take(&mut self.state.lock().tick_due)
    }

    /// Returns true once shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Requests the game to shut down.
    ///
    /// Also wakes the game loop, so a loop blocked in
    /// [`wait_for_wake`](Self::wait_for_wake) notices without waiting for
    /// the next heartbeat.
    pub fn request_shutdown(&self) {
        let mut state = self.state.lock();
        if !state.shutdown {
            tracing::info!("shutdown requested");
        }
        state.shutdown = true;
        state.wake = true;
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_before_wait() {
        let signals = DriverSignals::new();
        signals.signal();
        assert!(signals.is_signaled());

        signals.wait_for_wake();
        assert!(!signals.is_signaled());
    }

    #[test]
    fn test_signals_coalesce() {
        let signals = DriverSignals::new();
        signals.signal();
        signals.signal();
        signals.signal();
        signals.wait_for_wake();
        assert!(!signals.is_signaled());
    }

    #[test]
    fn test_wake_from_other_thread() {
        let signals = Arc::new(DriverSignals::new());
        let remote = Arc::clone(&signals);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.signal();
        });

        signals.wait_for_wake();
        handle.join().unwrap();
        assert!(!signals.is_signaled());
    }

    #[test]
    fn test_shutdown_wakes_waiter() {
        let signals = Arc::new(DriverSignals::new());
        let remote = Arc::clone(&signals);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.request_shutdown();
        });

        signals.wait_for_wake();
        handle.join().unwrap();
        assert!(signals.is_shutdown());
    }

    #[test]
    fn test_tick_flag() {
        let signals = DriverSignals::new();
        assert!(!signals.is_tick_due());

        signals.set_tick_due(true);
        assert!(signals.is_tick_due());
        assert!(signals.take_tick_due());
        assert!(!signals.is_tick_due());
        assert!(!signals.take_tick_due());
    }
}
