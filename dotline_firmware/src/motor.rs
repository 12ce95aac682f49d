//! Paper feed stepper.
//!
//! Two coils, eight half-step phases. The minimum interval between steps is
//! enforced with the timer's compare deadline so time spent printing between
//! two feed commands counts toward it.

use crate::port::{HardwarePort, Outputs};
use crate::timing::Timer;
use core::fmt;
use dotline_common::PrinterStatus;

/// Coil pattern for each half-step phase.
pub const PHASE_TABLE: [Outputs; 8] = [
    Outputs::A1,
    Outputs::A1.union(Outputs::B1),
    Outputs::B1,
    Outputs::B1.union(Outputs::A2),
    Outputs::A2,
    Outputs::A2.union(Outputs::B2),
    Outputs::B2,
    Outputs::B2.union(Outputs::A1),
];

/// Hardware safety condition that stopped the motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interlock {
    ThermalAlarm,
    PaperOut,
}

impl Interlock {
    /// Status flag raised for this interlock.
    pub const fn status_flag(self) -> PrinterStatus {
        match self {
            Self::ThermalAlarm => PrinterStatus::THERMAL_ALARM,
            Self::PaperOut => PrinterStatus::PAPER_OUT,
        }
    }
}

impl fmt::Display for Interlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThermalAlarm => write!(f, "motor driver thermal alarm"),
            Self::PaperOut => write!(f, "paper out"),
        }
    }
}

/// Stepper phase state.
#[derive(Debug, Clone)]
pub struct Stepper {
    phase: usize,
    half_step_cycles: u32,
}

impl Stepper {
    pub const fn new(half_step_cycles: u32) -> Self {
        Self {
            phase: 0,
            half_step_cycles,
        }
    }

    /// Index into [`PHASE_TABLE`] of the next step.
    #[inline]
    pub const fn phase(&self) -> usize {
        self.phase
    }

    /// Coils off, phase 0, then arm the first inter-step deadline.
    ///
    /// Fails without arming if the driver is already over temperature.
    pub fn init<P: HardwarePort, T: Timer>(
        &mut self,
        port: &mut P,
        timer: &mut T,
    ) -> Result<(), Interlock> {
        self.de_energize(port);
        if port.thermal_alarm() {
            return Err(Interlock::ThermalAlarm);
        }
        timer.arm_compare(self.half_step_cycles);
        Ok(())
    }

    /// Advance one half-step.
    pub fn half_step<P: HardwarePort, T: Timer>(
        &mut self,
        port: &mut P,
        timer: &mut T,
    ) -> Result<(), Interlock> {
        if port.thermal_alarm() {
            self.de_energize(port);
            return Err(Interlock::ThermalAlarm);
        }

        timer.wait_compare();
        port.update(Outputs::COILS, PHASE_TABLE[self.phase]);
        timer.arm_compare(self.half_step_cycles);
        self.phase = (self.phase + 1) % PHASE_TABLE.len();

        if port.paper_out() {
            self.de_energize(port);
            return Err(Interlock::PaperOut);
        }
        Ok(())
    }

    /// Release both coils and return to phase 0.
    ///
    /// The inter-step deadline stays armed. The next `half_step` still waits
    /// out the interval, and the next Open re-arms it after its thermal
    /// check.
    pub fn de_energize<P: HardwarePort>(&mut self, port: &mut P) {
        port.clear(Outputs::COILS);
        self.phase = 0;
    }
}
