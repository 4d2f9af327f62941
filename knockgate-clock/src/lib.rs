//! Clock abstraction for knockgate.
//!
//! Authorization windows are measured against a monotonic clock in
//! nanoseconds. The trait lets the decision engine run against the real
//! `CLOCK_MONOTONIC` in production and against deterministic clocks in tests
//! and frame replay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::time::{clock_gettime, ClockId};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Trait for getting the current monotonic time.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic time in nanoseconds.
    fn now_ns(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

/// Real monotonic clock backed by `CLOCK_MONOTONIC`.
///
/// This is the same time base the kernel hands to packet hooks, so
/// timestamps recorded here are comparable across processes on one host.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC).expect("CLOCK_MONOTONIC is always available");
        Duration::from(ts).as_nanos() as u64
    }
}

/// Mock clock for testing with a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    timestamp_ns: u64,
}

impl MockClock {
    /// Create a mock clock with a fixed timestamp in nanoseconds.
    pub fn new(timestamp_ns: u64) -> Self {
        Self { timestamp_ns }
    }

    /// Create a mock clock at a whole number of seconds.
    pub fn at_secs(secs: u64) -> Self {
        Self::new(secs.saturating_mul(NANOS_PER_SEC))
    }
}

impl Clock for MockClock {
    fn now_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

/// Clock whose time is moved explicitly by its owner.
///
/// Shared between threads by reference; frame replay sets it to each
/// record's capture timestamp before classifying the frame.
#[derive(Debug, Default)]
pub struct ManualClock {
    timestamp_ns: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock starting at `timestamp_ns`.
    pub fn new(timestamp_ns: u64) -> Self {
        Self {
            timestamp_ns: AtomicU64::new(timestamp_ns),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, timestamp_ns: u64) {
        self.timestamp_ns.store(timestamp_ns, Ordering::SeqCst);
    }

    /// Move the clock forward, saturating at `u64::MAX`.
    pub fn advance(&self, by: Duration) {
        let by_ns = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .timestamp_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(by_ns))
            });
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.timestamp_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_returns_fixed_timestamp() {
        let clock = MockClock::new(1234567890);
        assert_eq!(clock.now_ns(), 1234567890);
        assert_eq!(clock.now_ns(), 1234567890);
    }

    #[test]
    fn test_mock_clock_at_secs() {
        let clock = MockClock::at_secs(60);
        assert_eq!(clock.now_ns(), 60 * NANOS_PER_SEC);
    }

    #[test]
    fn test_mock_clock_at_secs_saturates() {
        let clock = MockClock::at_secs(u64::MAX);
        assert_eq!(clock.now_ns(), u64::MAX);
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock;
        let t1 = clock.now_ns();
        let t2 = clock.now_ns();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock;
        let t1 = clock.now_ns();
        std::thread::sleep(Duration::from_millis(2));
        let t2 = clock.now_ns();
        assert!(t2 - t1 >= 1_000_000);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now_ns(), 10);
        clock.set(5);
        assert_eq!(clock.now_ns(), 5);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(0);
        clock.advance(Duration::from_secs(1));
        clock.advance(Duration::from_nanos(5));
        assert_eq!(clock.now_ns(), NANOS_PER_SEC + 5);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(u64::MAX - 1);
        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now_ns(), u64::MAX);
    }

    #[test]
    fn test_shared_clock_sees_updates() {
        let clock = Arc::new(ManualClock::new(0));
        let shared = Arc::clone(&clock);
        let borrowed = &*clock;
        clock.set(99);
        assert_eq!(shared.now_ns(), 99);
        assert_eq!(Clock::now_ns(&borrowed), 99);
    }

    #[test]
    fn test_clock_trait_object() {
        let mock: Box<dyn Clock> = Box::new(MockClock::new(42));
        assert_eq!(mock.now_ns(), 42);

        let manual: Box<dyn Clock> = Box::new(ManualClock::default());
        assert_eq!(manual.now_ns(), 0);
    }
}
