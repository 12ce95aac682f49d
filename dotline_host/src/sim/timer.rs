//! Virtual cycle counter for the simulated coprocessor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use dotline_firmware::Timer;
use dotline_firmware::timing::CLOCK_HZ;
use tracing::debug;

/// Owed cycles are slept off once they reach one millisecond.
const PACING_QUANTUM: u64 = CLOCK_HZ as u64 / 1000;

/// Wall-clock length of `cycles` core cycles.
pub fn cycles_to_duration(cycles: u64) -> Duration {
    Duration::from_nanos(cycles.saturating_mul(1_000_000_000) / u64::from(CLOCK_HZ))
}

/// [`Timer`] whose counter advances only when the firmware waits.
///
/// With pacing on, waits are also slept in real time so a simulated job
/// takes as long as it would on the head. Once `stop` is set the next wait
/// parks the calling thread for good.
#[derive(Debug)]
pub struct SimTimer {
    now: u64,
    deadline: Option<u64>,
    pacing: bool,
    owed: u64,
    stop: Arc<AtomicBool>,
}

impl SimTimer {
    pub fn new(pacing: bool, stop: Arc<AtomicBool>) -> Self {
        Self {
            now: 0,
            deadline: None,
            pacing,
            owed: 0,
            stop,
        }
    }

    /// Total cycles elapsed since start.
    pub fn elapsed_cycles(&self) -> u64 {
        self.now
    }

    fn advance(&mut self, cycles: u64) {
        if self.stop.load(Ordering::Acquire) {
            stall();
        }
        self.now += cycles;
        if self.pacing {
            self.owed += cycles;
            if self.owed >= PACING_QUANTUM {
                thread::sleep(cycles_to_duration(self.owed));
                self.owed = 0;
            }
        }
    }
}

impl Timer for SimTimer {
    fn now(&self) -> u32 {
        self.now as u32
    }

    fn delay(&mut self, cycles: u32) {
        self.advance(u64::from(cycles));
    }

    fn arm_compare(&mut self, cycles: u32) {
        self.deadline = Some(self.now + u64::from(cycles));
    }

    fn compare_matched(&self) -> bool {
        self.deadline.is_none_or(|deadline| self.now >= deadline)
    }

    fn disarm_compare(&mut self) {
        self.deadline = None;
    }

    fn wait_compare(&mut self) {
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_sub(self.now);
            self.advance(remaining);
        }
        self.disarm_compare();
    }
}

fn stall() -> ! {
    debug!("Simulated core stopped");
    loop {
        thread::park();
    }
}
