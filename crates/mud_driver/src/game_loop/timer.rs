//! # Heartbeat Timer
//!
//! Background thread that marks a heartbeat as due once per interval and
//! wakes the game loop.
//!
//! The sleep is self-correcting: each wait is the interval minus the time
//! already spent since the previous heartbeat, clamped at zero, so the
//! heartbeats do not drift when the thread is scheduled late.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use mud_core::DriverSignals;

use crate::error::{DriverError, DriverResult};

/// Time left until the next heartbeat. Never negative.
#[inline]
#[must_use]
pub fn next_wait(interval: Duration, since_last: Duration) -> Duration {
    interval.saturating_sub(since_last)
}

/// Handle to the running heartbeat thread.
///
/// Dropping the handle stops the thread and waits for it to exit.
pub struct HeartbeatTimer {
    /// Set when the thread should exit.
    stop: Arc<AtomicBool>,
    /// Breaks the sleep early.
    stop_tx: Sender<()>,
    /// Heartbeats fired so far.
    beats: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatTimer {
    /// Starts the heartbeat thread.
    ///
    /// # Errors
    ///
    /// [`DriverError::ThreadSpawn`] if the thread can't be created.
    pub fn start(interval: Duration, signals: Arc<DriverSignals>) -> DriverResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let beats = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread_stop = Arc::clone(&stop);
        let thread_beats = Arc::clone(&beats);
        let handle = thread::Builder::new()
            .name("heartbeat".to_string())
            .spawn(move || {
                tracing::debug!(interval_ms = interval.as_millis() as u64, "heartbeat timer started");
                let mut last_run = Instant::now();

                while !thread_stop.load(Ordering::Acquire) {
                    let wait = next_wait(interval, last_run.elapsed());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if thread_stop.load(Ordering::Acquire) {
                                break;
                            }
                            last_run = Instant::now();
                            thread_beats.fetch_add(1, Ordering::Relaxed);
                            signals.set_tick_due(true);
                            signals.signal();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("heartbeat timer stopped");
            })
            .map_err(|source| DriverError::ThreadSpawn {
                thread: "heartbeat",
                source,
            })?;

        Ok(Self {
            stop,
            stop_tx,
            beats,
            handle: Some(handle),
        })
    }

    /// Returns the number of heartbeats fired so far.
    #[must_use]
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    /// Returns true while the thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the thread and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        let _ = self.stop_tx.try_send(());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("heartbeat thread panicked");
            }
        }
    }
}

impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_wait_clamps_to_zero() {
        let interval = Duration::from_millis(1000);
        assert_eq!(next_wait(interval, Duration::ZERO), interval);
        assert_eq!(
            next_wait(interval, Duration::from_millis(300)),
            Duration::from_millis(700)
        );
        assert_eq!(next_wait(interval, interval), Duration::ZERO);
        assert_eq!(next_wait(interval, Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_timer_fires_and_wakes() {
        let signals = Arc::new(DriverSignals::new());
        let mut timer = HeartbeatTimer::start(Duration::from_millis(10), Arc::clone(&signals)).unwrap();

        signals.wait_for_wake();
        assert!(signals.take_tick_due());

        timer.stop();
        assert!(timer.beats() >= 1);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_stop_breaks_long_sleep() {
        let signals = Arc::new(DriverSignals::new());
        let mut timer = HeartbeatTimer::start(Duration::from_secs(3600), Arc::clone(&signals)).unwrap();
        assert!(timer.is_running());

        let started = Instant::now();
        timer.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(timer.beats(), 0);
        assert!(!signals.is_tick_due());

        // Second stop is harmless
        timer.stop();
    }

    #[test]
    fn test_drop_stops_thread() {
        let signals = Arc::new(DriverSignals::new());
        let timer = HeartbeatTimer::start(Duration::from_millis(5), Arc::clone(&signals)).unwrap();
        drop(timer);

        // Only our handle is left once the thread has exited
        assert_eq!(Arc::strong_count(&signals), 1);
    }
}
