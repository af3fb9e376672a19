//! Fixed-window order-rate limiter.

use parking_lot::Mutex;

use keel_core::Clock;

#[derive(Debug, Default)]
struct WindowState {
    /// Orders counted in the current window.
    count: u32,
    /// Wall-clock start of the current window (ms since epoch).
    window_start_ms: u64,
}

/// Coarse fixed one-second window over order admissions.
///
/// The counter resets whenever the wall-clock delta since the window
/// start is >= 1 second, else it increments. This is a known
/// approximation: a burst straddling a window boundary can admit up to
/// 2x `max_per_second` orders. Kept deliberately; a sliding window would
/// change admission behavior the rest of the system is calibrated to.
#[derive(Debug)]
pub struct RateWindow<C: Clock> {
    clock: C,
    max_per_second: u32,
    state: Mutex<WindowState>,
}

impl<C: Clock> RateWindow<C> {
    const WINDOW_MS: u64 = 1000;

    /// Create a window admitting `max_per_second` orders.
    pub fn new(clock: C, max_per_second: u32) -> Self {
        let window_start_ms = clock.now_ms();
        Self {
            clock,
            max_per_second,
            state: Mutex::new(WindowState {
                count: 0,
                window_start_ms,
            }),
        }
    }

    /// Count one admission attempt. Returns false when the current
    /// window is already at capacity.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        if now.saturating_sub(state.window_start_ms) >= Self::WINDOW_MS {
            state.window_start_ms = now;
            state.count = 1;
        } else {
            state.count += 1;
        }

        state.count <= self.max_per_second
    }

    /// Zero the counter and restart the window at the current time.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.count = 0;
        state.window_start_ms = self.clock.now_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Clock whose time only moves when the test says so.
    #[derive(Clone, Default)]
    struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        fn advance(&self, ms: u64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_rejects_above_limit_within_window() {
        let window = RateWindow::new(ManualClock::default(), 2);

        assert!(window.try_acquire());
        assert!(window.try_acquire());
        assert!(!window.try_acquire());
    }

    #[test]
    fn test_counter_resets_after_one_second() {
        let clock = ManualClock::default();
        let window = RateWindow::new(clock.clone(), 2);

        assert!(window.try_acquire());
        assert!(window.try_acquire());
        assert!(!window.try_acquire());

        clock.advance(1000);
        assert!(window.try_acquire());
        assert!(window.try_acquire());
        assert!(!window.try_acquire());
    }

    #[test]
    fn test_boundary_burst_admits_up_to_double() {
        // Documented fixed-window behavior: a burst split across the
        // boundary admits 2x the per-second limit.
        let clock = ManualClock::default();
        let window = RateWindow::new(clock.clone(), 3);

        clock.advance(900);
        for _ in 0..3 {
            assert!(window.try_acquire());
        }

        clock.advance(101); // crosses the boundary
        for _ in 0..3 {
            assert!(window.try_acquire());
        }
        assert!(!window.try_acquire());
    }

    #[test]
    fn test_manual_reset() {
        let window = RateWindow::new(ManualClock::default(), 1);

        assert!(window.try_acquire());
        assert!(!window.try_acquire());

        window.reset();
        assert!(window.try_acquire());
    }
}
