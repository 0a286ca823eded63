//! The window contract: decides when a trailing range of buffered rows is
//! ready to be reduced by an aggregator.

#![forbid(unsafe_code)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Describes one emitted window: how many trailing buffered rows
/// participate, and how many rows to drop from the buffer's front once the
/// emission has been consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowSpec<T> {
    /// The tick associated with this emission.
    pub timestamp: T,
    /// Number of trailing buffered rows the window covers.
    pub size: u64,
    /// Number of rows to evict from the buffer's front after emission.
    pub evict: u64,
}

/// A window policy. Implementations are supplied by integrators; the core
/// itself ships none (concrete policies like tumbling-by-duration or
/// counter windows are out of scope, see the crate's top-level docs).
pub trait Window<T, V>: Clone {
    /// Feeds one row. Returns `true` if a window is now ready to be
    /// emitted (i.e. `emit()` may be called).
    fn process(&mut self, tick: T, row: &[V]) -> bool;

    /// Forces emission of whatever has been buffered so far, even if the
    /// policy would not otherwise have emitted yet. Returns `true` if a
    /// (possibly partial) window was produced.
    fn flush(&mut self) -> bool;

    /// The most recently readied window. Only meaningful immediately after
    /// `process` or `flush` returned `true`.
    fn emit(&self) -> WindowSpec<T>;

    /// Resets the policy to its freshly constructed state.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A counter-based window policy: emits every `n` processed rows.
    #[derive(Clone)]
    struct CounterWindow {
        n: u64,
        count: u64,
        last_tick: u64,
    }

    impl CounterWindow {
        fn new(n: u64) -> Self {
            Self { n, count: 0, last_tick: 0 }
        }
    }

    impl Window<u64, f64> for CounterWindow {
        fn process(&mut self, tick: u64, _row: &[f64]) -> bool {
            self.count += 1;
            self.last_tick = tick;
            self.count == self.n
        }
        fn flush(&mut self) -> bool {
            self.count > 0
        }
        fn emit(&self) -> WindowSpec<u64> {
            WindowSpec { timestamp: self.last_tick, size: self.count, evict: self.count }
        }
        fn reset(&mut self) {
            self.count = 0;
            self.last_tick = 0;
        }
    }

    #[test]
    fn single_point_window_flush_has_size_and_evict_one() {
        let mut w = CounterWindow::new(5);
        assert!(!w.process(1, &[10.0]));
        assert!(w.flush());
        let spec = w.emit();
        assert_eq!(spec.size, 1);
        assert_eq!(spec.evict, 1);
    }

    #[test]
    fn flush_with_nothing_buffered_reports_no_window() {
        let mut w = CounterWindow::new(5);
        assert!(!w.flush());
    }
}
