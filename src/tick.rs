//! The `Tick` bound the engine is generic over.
//!
//! The core never hard-codes a single timestamp representation: integer
//! sequence numbers, `f64` sample times (via the [`FloatTick`] wrapper, since
//! raw `f64` has no total order), and wall-clock instants all satisfy
//! [`Tick`] given an ordering and a subtraction that yields a `Duration`.

#![forbid(unsafe_code)]

/// A monotonically comparable point in time (or in sequence).
///
/// `step` callers must supply strictly increasing ticks; the engine checks
/// this at runtime (see [`crate::StepError::NonMonotonicTick`]) rather than
/// at the type level.
pub trait Tick: Copy + Ord {
    /// The result of subtracting two ticks.
    type Duration: Copy;

    /// `self - other`. Callers only subtract in increasing order, so this
    /// never needs to represent a negative duration.
    fn sub_tick(self, other: Self) -> Self::Duration;

    /// `self + duration`.
    fn add_duration(self, duration: Self::Duration) -> Self;
}

macro_rules! impl_tick_int {
    ($($t:ty),*) => {
        $(
            impl Tick for $t {
                type Duration = $t;

                #[inline]
                fn sub_tick(self, other: Self) -> Self::Duration {
                    self - other
                }

                #[inline]
                fn add_duration(self, duration: Self::Duration) -> Self {
                    self + duration
                }
            }
        )*
    };
}

impl_tick_int!(i64, u64, i32, u32, isize, usize);

/// An ordered wrapper around `f64`, satisfying [`Tick`]'s `Ord` bound via
/// `f64::total_cmp`.
///
/// Raw `f64` has no total order (`NaN` is incomparable under `PartialOrd`),
/// so it cannot implement `Tick` directly; this newtype supplies one. Ticks
/// that are never `NaN` compare exactly like plain `f64` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatTick(pub f64);

impl Eq for FloatTick {}

impl PartialOrd for FloatTick {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatTick {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Tick for FloatTick {
    type Duration = f64;

    #[inline]
    fn sub_tick(self, other: Self) -> Self::Duration {
        self.0 - other.0
    }

    #[inline]
    fn add_duration(self, duration: Self::Duration) -> Self {
        FloatTick(self.0 + duration)
    }
}

/// Wall-clock tick backed by [`chrono`]. Gated behind the `chrono` feature
/// since the core itself has no need for calendar semantics.
#[cfg(feature = "chrono")]
mod chrono_tick {
    use super::Tick;
    use chrono::{DateTime, TimeDelta, Utc};

    impl Tick for DateTime<Utc> {
        type Duration = TimeDelta;

        #[inline]
        fn sub_tick(self, other: Self) -> Self::Duration {
            self - other
        }

        #[inline]
        fn add_duration(self, duration: Self::Duration) -> Self {
            self + duration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_tick_round_trips() {
        let a: i64 = 10;
        let b: i64 = 17;
        let d = b.sub_tick(a);
        assert_eq!(d, 7);
        assert_eq!(a.add_duration(d), b);
    }

    #[test]
    fn integer_ticks_order_strictly() {
        let ticks: [u64; 4] = [1, 2, 5, 9];
        for w in ticks.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn float_tick_round_trips_and_orders() {
        let a = FloatTick(1.5);
        let b = FloatTick(4.25);
        let d = b.sub_tick(a);
        assert_eq!(d, 2.75);
        assert_eq!(a.add_duration(d), b);
        assert!(a < b);
    }
}
