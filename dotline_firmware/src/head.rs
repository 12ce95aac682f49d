//! Print head serial interface.
//!
//! One line is shifted MSB-first into the head's 384-bit shift register,
//! latched, then burned in four strobe passes over fixed dot segments.

use crate::port::{HardwarePort, Outputs};
use crate::timing::{HeadTiming, Timer};
use dotline_common::geometry::{BYTES_PER_LINE, MAX_BLACK_DOTS_PER_LINE};

/// Strobe line and the 1-based dot range it energizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrobeSegment {
    pub signal: Outputs,
    pub first_dot: u16,
    pub last_dot: u16,
}

/// Strobe order used for every line.
pub const STROBE_SEQUENCE: [StrobeSegment; 4] = [
    StrobeSegment {
        signal: Outputs::STB1_N,
        first_dot: 321,
        last_dot: 384,
    },
    StrobeSegment {
        signal: Outputs::STB23_N,
        first_dot: 193,
        last_dot: 320,
    },
    StrobeSegment {
        signal: Outputs::STB4_N,
        first_dot: 129,
        last_dot: 192,
    },
    StrobeSegment {
        signal: Outputs::STB56_N,
        first_dot: 1,
        last_dot: 128,
    },
];

/// Outputs cycled by the diagnostic test vector, in order.
pub const TEST_VECTOR: [Outputs; 13] = [
    Outputs::A1,
    Outputs::A2,
    Outputs::B1,
    Outputs::B2,
    Outputs::STB1_N,
    Outputs::STB23_N,
    Outputs::STB4_N,
    Outputs::STB56_N,
    Outputs::CLK,
    Outputs::LAT_N,
    Outputs::MOSI,
    Outputs::PAPER_SENSE,
    Outputs::PWR_N,
];

/// Head sequencing with fixed timing and dot budget.
#[derive(Debug, Clone, Copy)]
pub struct PrintHead {
    timing: HeadTiming,
    max_black_dots: usize,
}

impl PrintHead {
    pub const fn new(timing: HeadTiming, max_black_dots: usize) -> Self {
        Self {
            timing,
            max_black_dots,
        }
    }

    #[inline]
    pub const fn timing(&self) -> &HeadTiming {
        &self.timing
    }

    /// Drive every output to its unpowered, non-energizing level.
    pub fn safe_outputs<P: HardwarePort>(&self, port: &mut P) {
        port.write_outputs(Outputs::SAFE);
    }

    /// Power head logic and paper sensor, then wait for the supplies to settle.
    pub fn power_on<P: HardwarePort, T: Timer>(&self, port: &mut P, timer: &mut T) {
        port.update(Outputs::PWR_N, Outputs::PAPER_SENSE);
        timer.delay(self.timing.supply_settle);
    }

    pub fn power_off<P: HardwarePort>(&self, port: &mut P) {
        port.update(Outputs::PAPER_SENSE, Outputs::PWR_N);
    }

    /// Shift one line into the head.
    ///
    /// Black dots past the budget are sent as white. Returns how many were
    /// dropped that way.
    pub fn shift_line<P: HardwarePort, T: Timer>(
        &self,
        port: &mut P,
        timer: &mut T,
        dots: &[u8; BYTES_PER_LINE],
    ) -> usize {
        let mut black = 0usize;
        let mut clipped = 0usize;

        for &byte in dots {
            for bit in (0..8).rev() {
                let mut on = byte & (1 << bit) != 0;
                if on {
                    black += 1;
                    if black > self.max_black_dots {
                        clipped += 1;
                        on = false;
                    }
                }

                if on {
                    port.set(Outputs::MOSI);
                } else {
                    port.clear(Outputs::MOSI);
                }
                timer.delay(self.timing.shift_low());

                port.set(Outputs::CLK);
                timer.delay(self.timing.shift_high());
                port.clear(Outputs::CLK);
            }
        }

        clipped
    }

    /// Transfer the shift register into the head's output latch.
    pub fn latch<P: HardwarePort, T: Timer>(&self, port: &mut P, timer: &mut T) {
        timer.delay(self.timing.latch_setup);
        port.clear(Outputs::LAT_N);
        timer.delay(self.timing.latch_width);
        port.set(Outputs::LAT_N);
        timer.delay(self.timing.latch_hold);
    }

    /// Pulse each strobe in [`STROBE_SEQUENCE`] order.
    pub fn strobe_all<P: HardwarePort, T: Timer>(&self, port: &mut P, timer: &mut T) {
        for segment in STROBE_SEQUENCE {
            timer.delay(self.timing.strobe_setup);
            port.clear(segment.signal);
            timer.delay(self.timing.strobe_hold());
            port.set(segment.signal);
            timer.delay(self.timing.driver_off_delay);
        }
    }

    /// Shift, latch and strobe one line. Returns the clipped dot count.
    pub fn print_line<P: HardwarePort, T: Timer>(
        &self,
        port: &mut P,
        timer: &mut T,
        dots: &[u8; BYTES_PER_LINE],
    ) -> usize {
        let clipped = self.shift_line(port, timer, dots);
        self.latch(port, timer);
        self.strobe_all(port, timer);
        clipped
    }

    /// One pass over [`TEST_VECTOR`]: each output on, dwell, off, dwell.
    pub fn test_signal_pass<P: HardwarePort, T: Timer>(&self, port: &mut P, timer: &mut T) {
        for signal in TEST_VECTOR {
            port.set(signal);
            timer.delay(self.timing.test_dwell);
            port.clear(signal);
            timer.delay(self.timing.test_dwell);
        }
    }

    /// Cycle the test vector forever. Never use with a head attached.
    pub fn run_test_signals<P: HardwarePort, T: Timer>(&self, port: &mut P, timer: &mut T) -> ! {
        loop {
            self.test_signal_pass(port, timer);
        }
    }
}

impl Default for PrintHead {
    fn default() -> Self {
        Self::new(HeadTiming::DATASHEET, MAX_BLACK_DOTS_PER_LINE)
    }
}
