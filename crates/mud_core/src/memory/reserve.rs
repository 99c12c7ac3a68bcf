//! # Memory Reserve
//!
//! A buffer of configurable size, allocated once and held only so that it
//! can be given back. A size of `0` disables the reserve.
//!
//! The buffer disappears in one of two ways:
//! - Something under memory pressure calls [`MemoryReserve::reclaim`]
//!   (an allocation-failure handler, a pressure monitor, a test)
//! - The allocation probe run by [`MemoryReserve::is_available`] fails, in
//!   which case the reserve reclaims itself
//!
//! Either way the memory goes back to the allocator, which gives the driver
//! room to shut down in an orderly fashion.

use parking_lot::Mutex;

/// Checks whether an allocation of the given size would currently succeed.
type Probe = fn(usize) -> bool;

/// Throwaway fallible allocation of `size` bytes.
fn allocation_probe(size: usize) -> bool {
    Vec::<u8>::new().try_reserve_exact(size).is_ok()
}

enum ReserveState {
    /// No reserve held: never reserved, reset, or size `0`.
    Disarmed,
    /// Reserve held.
    Armed(Vec<u8>),
    /// Reserve given back under memory pressure.
    Reclaimed,
}

/// Out-of-memory early warning.
pub struct MemoryReserve {
    size: u64,
    state: Mutex<ReserveState>,
    probe: Probe,
}

impl MemoryReserve {
    /// Creates a reserve of `size` bytes. Nothing is allocated until
    /// [`reserve`](Self::reserve) is called.
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self::with_probe(size, allocation_probe)
    }

    /// Creates a reserve with a custom allocation probe.
    #[must_use]
    pub fn with_probe(size: u64, probe: fn(usize) -> bool) -> Self {
        Self {
            size,
            state: Mutex::new(ReserveState::Disarmed),
            probe,
        }
    }

    /// Returns the configured size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Allocates the reserve.
    ///
    /// Does nothing for a size of `0`. If the allocation itself fails, the
    /// reserve starts out reclaimed, so the next availability check reports
    /// the shortage.
    pub fn reserve(&self) {
        if self.size == 0 {
            tracing::info!("no memory to be reserved");
            return;
        }

        let new_state = match Self::allocate(self.size) {
            Some(buffer) => {
                tracing::info!(bytes = self.size, "reserved memory");
                ReserveState::Armed(buffer)
            }
            None => {
                tracing::warn!(bytes = self.size, "could not allocate memory reserve");
                ReserveState::Reclaimed
            }
        };
        *self.state.lock() = new_state;
    }

    fn allocate(size: u64) -> Option<Vec<u8>> {
        let size = usize::try_from(size).ok()?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).ok()?;
        // Touch every page so the reserve is backed by real memory.
        buffer.resize(size, 0);
        Some(buffer)
    }

    /// Returns true if the reserve is still held, or if no reserve was set
    /// up to begin with.
    ///
    /// # Cost
    ///
    /// While the reserve is held, every call runs the probe once with the
    /// full reserve size. The default probe makes a throwaway allocation of
    /// that size and frees it again without touching its pages. For a large
    /// reserve this is usually a map/unmap pair in the system allocator. The
    /// game loop calls this once per tick, so a busy loop pays that price
    /// per tick. A disarmed or reclaimed reserve never runs the probe.
    pub fn is_available(&self) -> bool {
        let mut state = self.state.lock();
        let available = match &*state {
            ReserveState::Disarmed => true,
            ReserveState::Reclaimed => false,
            ReserveState::Armed(buffer) => (self.probe)(buffer.len()),
        };

        if !available {
            // A failed probe gives the reserve back, like a collector would.
            *state = ReserveState::Reclaimed;
            tracing::warn!(bytes = self.size, "out-of-memory situation detected");
        }
        available
    }

    /// Gives the reserve back to the allocator.
    ///
    /// Returns true if a held reserve was freed by this call.
    pub fn reclaim(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, ReserveState::Armed(_)) {
            // Dropping the old state frees the buffer.
            *state = ReserveState::Reclaimed;
            tracing::debug!(bytes = self.size, "memory reserve reclaimed");
            true
        } else {
            false
        }
    }

    /// Drops the reserve entirely.
    ///
    /// All later [`is_available`](Self::is_available) calls return true until
    /// [`reserve`](Self::reserve) is called again. Used once a graceful
    /// shutdown has begun, so it is not hampered by more OOM alerts.
    pub fn reset(&self) {
        *self.state.lock() = ReserveState::Disarmed;
        tracing::info!("memory reserve reset");
    }

    /// Returns true while a reserve buffer is held.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(*self.state.lock(), ReserveState::Armed(_))
    }
}

impl std::fmt::Debug for MemoryReserve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.state.lock() {
            ReserveState::Disarmed => "disarmed",
            ReserveState::Armed(_) => "armed",
            ReserveState::Reclaimed => "reclaimed",
        };
        f.debug_struct("MemoryReserve")
            .field("size", &self.size)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_size_always_available() {
        let reserve = MemoryReserve::with_probe(0, |_| false);
        assert!(reserve.is_available());

        reserve.reserve();
        assert!(!reserve.is_armed());
        assert!(reserve.is_available());
        assert!(!reserve.reclaim());
        assert!(reserve.is_available());
    }

    #[test]
    fn test_available_until_reclaimed() {
        let reserve = MemoryReserve::new(64 * 1024);
        reserve.reserve();
        assert!(reserve.is_armed());
        assert!(reserve.is_available());

        assert!(reserve.reclaim());
        assert!(!reserve.is_available());
        // Stays unavailable, it does not come back by itself
        assert!(!reserve.is_available());
        assert!(!reserve.reclaim());
    }

    #[test]
    fn test_failed_probe_reclaims() {
        let reserve = MemoryReserve::with_probe(4096, |_| false);
        reserve.reserve();
        assert!(reserve.is_armed());

        assert!(!reserve.is_available());
        assert!(!reserve.is_armed());
    }

    #[test]
    fn test_reset_and_rearm() {
        let reserve = MemoryReserve::new(4096);
        reserve.reserve();
        reserve.reclaim();
        assert!(!reserve.is_available());

        reserve.reset();
        assert!(reserve.is_available());
        assert!(!reserve.is_armed());

        reserve.reserve();
        assert!(reserve.is_armed());
        assert!(reserve.is_available());
    }

    #[test]
    fn test_failed_allocation_reports_unavailable() {
        let reserve = MemoryReserve::new(u64::MAX);
        reserve.reserve();
        assert!(!reserve.is_armed());
        assert!(!reserve.is_available());
    }

    static PROBE_CALLS: AtomicUsize = AtomicUsize::new(0);
    static PROBE_SIZE: AtomicUsize = AtomicUsize::new(0);

    fn counting_probe(size: usize) -> bool {
        PROBE_CALLS.fetch_add(1, Ordering::SeqCst);
        PROBE_SIZE.store(size, Ordering::SeqCst);
        true
    }

    #[test]
    fn test_one_full_size_probe_per_check() {
        let reserve = MemoryReserve::with_probe(8 * 1024, counting_probe);

        // Disarmed: no probe
        assert!(reserve.is_available());
        assert_eq!(PROBE_CALLS.load(Ordering::SeqCst), 0);

        reserve.reserve();
        for _ in 0..3 {
            assert!(reserve.is_available());
        }
        assert_eq!(PROBE_CALLS.load(Ordering::SeqCst), 3);
        assert_eq!(PROBE_SIZE.load(Ordering::SeqCst), 8 * 1024);

        // Reclaimed: no probe either
        reserve.reclaim();
        assert!(!reserve.is_available());
        assert_eq!(PROBE_CALLS.load(Ordering::SeqCst), 3);
    }
}
