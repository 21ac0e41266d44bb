//! Tick Clock
//!
//! Centisecond (`Tick`), 15-bit wrapping (`SmallTick`), and microsecond
//! (`MicroTick`) monotonic counters. A tick is 1/100 s, matching the
//! server's simulation rate. All comparisons use signed modular arithmetic
//! so wraparound never desyncs the client from the server.

use std::ops::{Add, Sub};

/// Sentinel meaning "not yet synchronized" for any small-tick field.
pub const INVALID_SMALL_TICK: u16 = 0xFFFF;

/// Reject position updates whose reconstructed timestamp is this far in the past.
pub const POSITION_STALE_THRESHOLD: i32 = 300;

/// `small tick` comparisons reject a reordering difference at or beyond this.
pub const SMALL_TICK_REORDER_SLACK: i32 = 999;

/// 15-bit mask used for `small tick` arithmetic.
const SMALL_TICK_MASK: u16 = 0x7FFF;

/// A 32-bit monotonic tick counter (1/100 s per unit).
///
/// Differences use wrapping signed arithmetic (`TICK_DIFF`) so a counter that
/// has wrapped around `u32::MAX` still compares correctly against a recent
/// value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u32);

impl Tick {
    /// Signed difference `self - other`, safe across wraparound.
    #[inline]
    pub fn diff(self, other: Tick) -> i32 {
        self.0.wrapping_sub(other.0) as i32
    }

    /// Truncate to the low 15 bits used by position packets.
    #[inline]
    pub fn to_small(self) -> SmallTick {
        SmallTick((self.0 as u16) & SMALL_TICK_MASK)
    }
}

impl Add<u32> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u32) -> Tick {
        Tick(self.0.wrapping_add(rhs))
    }
}

impl Sub<u32> for Tick {
    type Output = Tick;
    #[inline]
    fn sub(self, rhs: u32) -> Tick {
        Tick(self.0.wrapping_sub(rhs))
    }
}

/// A 15-bit wrapping tick counter embedded in position packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SmallTick(pub u16);

impl SmallTick {
    /// The "not synchronized yet" sentinel.
    pub const INVALID: SmallTick = SmallTick(INVALID_SMALL_TICK);

    /// Is this the invalid sentinel?
    #[inline]
    pub fn is_invalid(self) -> bool {
        self.0 == INVALID_SMALL_TICK
    }

    /// Returns true if `self` is strictly newer than `other`, treating the
    /// 15-bit space as circular: a difference `>= SMALL_TICK_REORDER_SLACK`
    /// is rejected as a stale reordering rather than a legitimate wrap.
    ///
    /// Matches the boundary example in the spec: `(a=30000, b=5)` classifies
    /// `b` as newer because `(b - a) mod 32768` is small, while the raw
    /// numeric difference looks huge.
    pub fn is_newer_than(self, other: SmallTick) -> bool {
        if other.is_invalid() {
            return true;
        }
        let diff = small_tick_diff(self.0, other.0);
        diff > 0 && diff < SMALL_TICK_REORDER_SLACK
    }
}

impl Default for SmallTick {
    fn default() -> Self {
        SmallTick::INVALID
    }
}

/// Signed difference between two 15-bit small ticks, wrapping at 2^15.
#[inline]
pub fn small_tick_diff(a: u16, b: u16) -> i32 {
    let a = (a & SMALL_TICK_MASK) as i32;
    let b = (b & SMALL_TICK_MASK) as i32;
    let raw = a - b;
    // Normalize into (-16384, 16384].
    const HALF: i32 = 1 << 14;
    const FULL: i32 = 1 << 15;
    if raw > HALF {
        raw - FULL
    } else if raw <= -HALF {
        raw + FULL
    } else {
        raw
    }
}

/// A 64-bit microsecond monotonic clock used by soccer sub-tick interpolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MicroTick(pub u64);

impl MicroTick {
    /// Duration of one simulation tick in microseconds (1/100 s).
    pub const TICK_DURATION_MICROS: u64 = 10_000;

    #[inline]
    pub fn diff(self, other: MicroTick) -> i64 {
        self.0 as i64 - other.0 as i64
    }
}

impl Sub for MicroTick {
    type Output = i64;
    #[inline]
    fn sub(self, rhs: MicroTick) -> i64 {
        self.diff(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tick_diff_handles_wraparound() {
        let a = Tick(5);
        let b = Tick(u32::MAX - 2);
        // b is 8 ticks before a when wrapping.
        assert_eq!(a.diff(b), 8);
        assert_eq!(b.diff(a), -8);
    }

    #[test]
    fn small_tick_boundary_example_from_spec() {
        // (a=30000, b=5): b is newer because the wrapped difference is small.
        let a = SmallTick(30000);
        let b = SmallTick(5);
        assert!(b.is_newer_than(a));
        assert!(!a.is_newer_than(b));
    }

    #[test]
    fn small_tick_rejects_reorder_at_the_slack_boundary() {
        let a = SmallTick(0);
        // A 998-tick-ahead value is still accepted as newer...
        assert!(SmallTick(998).is_newer_than(a));
        // ...but the slack boundary itself (999) is rejected as a stale reorder.
        assert!(!SmallTick(999).is_newer_than(a));
    }

    #[test]
    fn small_tick_invalid_is_always_older() {
        let a = SmallTick(100);
        assert!(a.is_newer_than(SmallTick::INVALID));
    }

    #[test]
    fn micro_tick_diff() {
        let a = MicroTick(20_000);
        let b = MicroTick(10_000);
        assert_eq!(a - b, 10_000);
    }

    proptest::proptest! {
        /// `diff` must stay consistent with wrapping `Add`/`Sub` for any pair
        /// of ticks, not just the hand-picked wraparound example above.
        #[test]
        fn tick_diff_agrees_with_wrapping_add(base in any::<u32>(), delta in 0u32..1_000_000) {
            let a = Tick(base);
            let b = a + delta;
            prop_assert_eq!(b.diff(a), delta as i32);
        }

        /// `small_tick_diff` always normalizes into the documented
        /// `(-16384, 16384]` range, regardless of input.
        #[test]
        fn small_tick_diff_stays_in_range(a in any::<u16>(), b in any::<u16>()) {
            let diff = small_tick_diff(a, b);
            prop_assert!(diff > -16384 && diff <= 16384);
        }
    }
}
