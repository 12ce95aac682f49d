//! Cycle timing.
//!
//! All delays are counted in coprocessor clock cycles. The head datasheet
//! values are converted once, at compile time, from the fixed core clock.

use static_assertions::const_assert;

/// Core clock feeding the cycle counter.
pub const CLOCK_HZ: u32 = 200_000_000;

/// Cycles in `ns` nanoseconds, truncated.
pub const fn ns_to_cycles(ns: u64) -> u32 {
    (CLOCK_HZ as u64 * ns / 1_000_000_000) as u32
}

/// Cycles in `ms` milliseconds.
pub const fn ms_to_cycles(ms: u32) -> u32 {
    CLOCK_HZ / 1000 * ms
}

/// Busy delays plus one compare deadline.
///
/// The deadline is armed, other work happens, and `wait_compare` blocks only
/// for whatever is left. An unarmed compare counts as already matched.
pub trait Timer {
    /// Free-running cycle counter.
    fn now(&self) -> u32;

    /// Block for `cycles`.
    fn delay(&mut self, cycles: u32);

    /// Arm the compare to fire `cycles` from now, clearing any earlier match.
    fn arm_compare(&mut self, cycles: u32);

    fn compare_matched(&self) -> bool;

    fn disarm_compare(&mut self);

    /// Spin until the armed deadline has passed, then disarm.
    fn wait_compare(&mut self) {
        while !self.compare_matched() {
            core::hint::spin_loop();
        }
        self.disarm_compare();
    }
}

impl<T: Timer> Timer for &mut T {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn delay(&mut self, cycles: u32) {
        (**self).delay(cycles);
    }

    fn arm_compare(&mut self, cycles: u32) {
        (**self).arm_compare(cycles);
    }

    fn compare_matched(&self) -> bool {
        (**self).compare_matched()
    }

    fn disarm_compare(&mut self) {
        (**self).disarm_compare();
    }

    fn wait_compare(&mut self) {
        (**self).wait_compare();
    }
}

/// Monotonic hardware counter, wrapping at `u32::MAX`.
pub trait CycleCounter {
    fn count(&self) -> u32;
}

/// [`Timer`] implemented on top of a bare cycle counter.
#[derive(Debug)]
pub struct CounterTimer<C> {
    counter: C,
    compare: Option<(u32, u32)>,
}

impl<C: CycleCounter> CounterTimer<C> {
    pub const fn new(counter: C) -> Self {
        Self {
            counter,
            compare: None,
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }
}

impl<C: CycleCounter> Timer for CounterTimer<C> {
    #[inline]
    fn now(&self) -> u32 {
        self.counter.count()
    }

    fn delay(&mut self, cycles: u32) {
        let start = self.counter.count();
        while self.counter.count().wrapping_sub(start) < cycles {
            core::hint::spin_loop();
        }
    }

    fn arm_compare(&mut self, cycles: u32) {
        self.compare = Some((self.counter.count(), cycles));
    }

    fn compare_matched(&self) -> bool {
        match self.compare {
            Some((armed_at, cycles)) => self.counter.count().wrapping_sub(armed_at) >= cycles,
            None => true,
        }
    }

    fn disarm_compare(&mut self) {
        self.compare = None;
    }
}

/// Head and motor timing in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadTiming {
    /// Serial clock high/low width.
    pub clock_width: u32,
    pub data_setup: u32,
    pub data_hold: u32,
    pub latch_setup: u32,
    pub latch_width: u32,
    pub latch_hold: u32,
    pub strobe_setup: u32,
    /// Dot energize time per strobe.
    pub strobe_energize: u32,
    /// Driver output delay after strobe assert.
    pub driver_on_delay: u32,
    /// Recovery after strobe release.
    pub driver_off_delay: u32,
    /// Minimum interval between motor half-steps (60 mm/s feed).
    pub half_step: u32,
    /// Settle before power changes.
    pub power_settle: u32,
    /// Settle after powering head logic and paper sensor.
    pub supply_settle: u32,
    /// Grace period before the core powers down.
    pub shutdown: u32,
    /// On and off dwell of the test signal vector.
    pub test_dwell: u32,
}

impl HeadTiming {
    pub const DATASHEET: Self = Self {
        clock_width: CLOCK_HZ / 8_000_000 / 2,
        data_setup: ns_to_cycles(70),
        data_hold: ns_to_cycles(30),
        latch_setup: ns_to_cycles(300),
        latch_width: ns_to_cycles(200),
        latch_hold: ns_to_cycles(50),
        strobe_setup: ns_to_cycles(300),
        strobe_energize: ms_to_cycles(1),
        driver_on_delay: ns_to_cycles(3000),
        driver_off_delay: ns_to_cycles(3000),
        half_step: ns_to_cycles(1_041_667),
        power_settle: ms_to_cycles(5),
        supply_settle: ms_to_cycles(100),
        shutdown: ms_to_cycles(500),
        test_dwell: ms_to_cycles(500),
    };

    /// Data low phase: setup time or clock low width, whichever is longer.
    #[inline]
    pub const fn shift_low(&self) -> u32 {
        max(self.data_setup, self.clock_width)
    }

    /// Clock high phase: hold time or clock high width, whichever is longer.
    #[inline]
    pub const fn shift_high(&self) -> u32 {
        max(self.data_hold, self.clock_width)
    }

    /// Strobe asserted time.
    #[inline]
    pub const fn strobe_hold(&self) -> u32 {
        max(self.driver_on_delay, self.strobe_energize)
    }
}

impl Default for HeadTiming {
    fn default() -> Self {
        Self::DATASHEET
    }
}

const fn max(a: u32, b: u32) -> u32 {
    if a > b { a } else { b }
}

const_assert!(HeadTiming::DATASHEET.half_step > 0);
const_assert!(HeadTiming::DATASHEET.strobe_energize >= HeadTiming::DATASHEET.driver_on_delay);
