//! Simulated print head, stepper and sensors behind the core registers.
//!
//! The model sits below [`RegisterPort`](dotline_firmware::port::RegisterPort):
//! it sees raw register words, decodes them through the pin map and reacts
//! to signal edges the way the head does.

use std::path::Path;
use std::sync::Arc;

use crate::error::HostError;
use dotline_common::geometry::{BYTES_PER_LINE, DOTS_PER_LINE};
use dotline_firmware::head::STROBE_SEQUENCE;
use dotline_firmware::motor::{Interlock, PHASE_TABLE};
use dotline_firmware::port::{CoreRegisters, Inputs, Outputs, PinMap};
use image::{GrayImage, Luma};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

/// Motor step counts after which a sensor reports a fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorTrips {
    pub thermal_after_steps: Option<u64>,
    pub paper_out_after_steps: Option<u64>,
}

impl SensorTrips {
    /// Interlock whose sensor trips on exactly this step.
    fn tripped_at(&self, steps: u64) -> Option<Interlock> {
        if self.thermal_after_steps == Some(steps) {
            Some(Interlock::ThermalAlarm)
        } else if self.paper_out_after_steps == Some(steps) {
            Some(Interlock::PaperOut)
        } else {
            None
        }
    }

    fn thermal(&self, steps: u64) -> bool {
        self.thermal_after_steps.is_some_and(|n| steps >= n)
    }

    fn paper_out(&self, steps: u64) -> bool {
        self.paper_out_after_steps.is_some_and(|n| steps >= n)
    }
}

/// Dots burned onto the simulated paper, one row per half-step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperLog {
    rows: Vec<[u8; BYTES_PER_LINE]>,
    position: usize,
    strobe_passes: usize,
    overcurrent_passes: usize,
}

impl PaperLog {
    pub fn rows(&self) -> &[[u8; BYTES_PER_LINE]] {
        &self.rows
    }

    /// Half-steps fed so far; the row under the head.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Strobe pulses that reached a powered head.
    pub fn strobe_passes(&self) -> usize {
        self.strobe_passes
    }

    /// Strobe pulses that energized more dots than the budget allows.
    pub fn overcurrent_passes(&self) -> usize {
        self.overcurrent_passes
    }

    pub fn black_dots(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }

    fn burn(&mut self, dots: &[u8; BYTES_PER_LINE]) {
        if self.rows.len() <= self.position {
            self.rows.resize(self.position + 1, [0; BYTES_PER_LINE]);
        }
        for (paper, dot) in self.rows[self.position].iter_mut().zip(dots) {
            *paper |= dot;
        }
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Black dots on white, one pixel per dot.
    pub fn to_image(&self) -> GrayImage {
        let height = self.rows.len().max(self.position).max(1) as u32;
        GrayImage::from_fn(DOTS_PER_LINE as u32, height, |x, y| {
            let black = self.rows.get(y as usize).is_some_and(|row| {
                let x = x as usize;
                row[x / 8] & (0x80 >> (x % 8)) != 0
            });
            if black { Luma([0]) } else { Luma([255]) }
        })
    }

    pub fn save_png(&self, path: &Path) -> Result<(), HostError> {
        self.to_image().save(path)?;
        Ok(())
    }
}

/// Head, stepper and sensors as seen through the core registers.
#[derive(Debug)]
pub struct SimulatedHead {
    pins: PinMap,
    register: u32,
    shift: [u8; BYTES_PER_LINE],
    latched: [u8; BYTES_PER_LINE],
    phase: Option<usize>,
    steps: u64,
    trips: SensorTrips,
    max_black_dots: usize,
    paper: Arc<Mutex<PaperLog>>,
}

impl SimulatedHead {
    pub fn new(
        pins: PinMap,
        trips: SensorTrips,
        max_black_dots: usize,
        paper: Arc<Mutex<PaperLog>>,
    ) -> Self {
        Self {
            pins,
            register: pins.to_physical(Outputs::SAFE),
            shift: [0; BYTES_PER_LINE],
            latched: [0; BYTES_PER_LINE],
            phase: None,
            steps: 0,
            trips,
            max_black_dots,
            paper,
        }
    }

    pub fn outputs(&self) -> Outputs {
        self.pins.outputs_from_physical(self.register)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Contents of the output latch.
    pub fn latched(&self) -> &[u8; BYTES_PER_LINE] {
        &self.latched
    }

    pub fn inputs(&self) -> Inputs {
        let mut inputs = Inputs::ALARM_N;
        if self.trips.thermal(self.steps) {
            inputs -= Inputs::ALARM_N;
        }
        if self.trips.paper_out(self.steps) {
            inputs |= Inputs::PAPER_OUT;
        }
        inputs
    }

    fn on_edges(&mut self, prev: Outputs, next: Outputs) {
        let rose = next - prev;
        let fell = prev - next;

        if rose.contains(Outputs::CLK) {
            self.shift_in(next.contains(Outputs::MOSI));
        }
        if fell.contains(Outputs::LAT_N) {
            self.latched = self.shift;
            trace!("Line latched");
        }

        let powered = !next.contains(Outputs::PWR_N);
        for segment in STROBE_SEQUENCE {
            if fell.contains(segment.signal) {
                self.strobe(segment.first_dot, segment.last_dot, powered);
            }
        }

        let coils = next & Outputs::COILS;
        if coils != prev & Outputs::COILS {
            self.move_motor(coils);
        }
    }

    fn shift_in(&mut self, bit: bool) {
        for i in 0..BYTES_PER_LINE {
            let carry = match self.shift.get(i + 1) {
                Some(next) => next >> 7,
                None => u8::from(bit),
            };
            self.shift[i] = (self.shift[i] << 1) | carry;
        }
    }

    fn strobe(&mut self, first_dot: u16, last_dot: u16, powered: bool) {
        if !powered {
            debug!(first_dot, last_dot, "Strobe with head unpowered");
            return;
        }

        let mut dots = [0u8; BYTES_PER_LINE];
        let mut energized = 0;
        for dot in usize::from(first_dot) - 1..usize::from(last_dot) {
            let mask = 0x80 >> (dot % 8);
            if self.latched[dot / 8] & mask != 0 {
                dots[dot / 8] |= mask;
                energized += 1;
            }
        }

        let mut paper = self.paper.lock();
        paper.strobe_passes += 1;
        if energized > self.max_black_dots {
            paper.overcurrent_passes += 1;
            warn!(energized, limit = self.max_black_dots, "Strobe exceeds black dot budget");
        }
        paper.burn(&dots);
        trace!(first_dot, last_dot, energized, row = paper.position, "Strobe");
    }

    fn move_motor(&mut self, coils: Outputs) {
        if coils.is_empty() {
            trace!("Motor coils released");
            self.phase = None;
            return;
        }
        let Some(index) = PHASE_TABLE.iter().position(|phase| *phase == coils) else {
            debug!(?coils, "Coil pattern outside the phase table");
            return;
        };
        if let Some(prev) = self.phase {
            if index != (prev + 1) % PHASE_TABLE.len() {
                warn!(from = prev, to = index, "Motor phase out of sequence");
            }
        }
        self.phase = Some(index);
        self.steps += 1;
        self.paper.lock().advance();
        trace!(phase = index, steps = self.steps, "Half-step");
        if let Some(interlock) = self.trips.tripped_at(self.steps) {
            warn!(steps = self.steps, "Simulated sensor trip: {interlock}");
        }
    }
}

impl CoreRegisters for SimulatedHead {
    fn read_output(&self) -> u32 {
        self.register
    }

    fn write_output(&mut self, value: u32) {
        let prev = self.outputs();
        let next = self.pins.outputs_from_physical(value);
        self.register = value;
        self.on_edges(prev, next);
    }

    fn read_input(&self) -> u32 {
        let inputs = self.inputs();
        self.pins
            .inputs
            .iter()
            .filter(|(signal, _)| inputs.contains(*signal))
            .fold(0, |word, &(_, bit)| word | (1 << bit))
    }
}
