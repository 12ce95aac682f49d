//! Test doubles shared by the firmware integration suites.

use std::collections::VecDeque;

use dotline_common::geometry::{BYTES_PER_LINE, STATUS_SIZE};
use dotline_common::item::{encoded_len, write_raw_item};
use dotline_common::{Command, LayoutError, QueueView};
use dotline_firmware::port::{HardwarePort, Inputs, Outputs};
use dotline_firmware::processor::{JobProcessor, ProcessorConfig};
use dotline_firmware::session::HostLink;
use dotline_firmware::timing::Timer;

// ── Batch builder ───────────────────────────────────────────────────

#[derive(Default)]
pub struct Batch {
    bytes: Vec<u8>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, command: u32, payload: &[u8]) -> Self {
        let start = self.bytes.len();
        self.bytes.resize(start + encoded_len(payload.len()), 0);
        write_raw_item(&mut self.bytes, start, command, payload);
        self
    }

    pub fn open(self) -> Self {
        self.push(Command::Open.code(), &[])
    }

    pub fn line(self, dots: &[u8]) -> Self {
        self.push(Command::PrintLine.code(), dots)
    }

    pub fn steps(self, count: u32) -> Self {
        self.push(Command::MotorHalfStep.code(), &count.to_le_bytes())
    }

    pub fn close(self) -> Self {
        self.push(Command::Close.code(), &[])
    }

    pub fn halt(self) -> Self {
        self.push(Command::HaltRequest.code(), &[])
    }

    pub fn eos(self) -> Self {
        self.push(Command::Eos.code(), &[])
    }

    pub fn raw(self, command: u32, payload: &[u8]) -> Self {
        self.push(command, payload)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A line with the first `count` dots black.
pub fn black_line(count: usize) -> [u8; BYTES_PER_LINE] {
    let mut line = [0u8; BYTES_PER_LINE];
    for dot in 0..count {
        line[dot / 8] |= 0x80 >> (dot % 8);
    }
    line
}

/// Shared memory block holding `batch` after a zeroed status word.
pub fn memory_with(batch: &Batch, capacity: usize) -> Vec<u8> {
    let mut memory = vec![0u8; STATUS_SIZE + capacity];
    memory[STATUS_SIZE..STATUS_SIZE + batch.bytes().len()].copy_from_slice(batch.bytes());
    memory
}

// ── Recording port ──────────────────────────────────────────────────

/// Port that records head activity and trips sensors after N motor steps.
pub struct BenchPort {
    outputs: Outputs,
    pub steps: usize,
    pub coil_history: Vec<Outputs>,
    pub clocked_bits: Vec<bool>,
    pub strobe_pulses: Vec<Outputs>,
    pub latches: usize,
    pub thermal_after_steps: Option<usize>,
    pub paper_out_after_steps: Option<usize>,
    pub thermal_now: bool,
}

impl BenchPort {
    pub fn new() -> Self {
        Self {
            outputs: Outputs::empty(),
            steps: 0,
            coil_history: Vec::new(),
            clocked_bits: Vec::new(),
            strobe_pulses: Vec::new(),
            latches: 0,
            thermal_after_steps: None,
            paper_out_after_steps: None,
            thermal_now: false,
        }
    }

    pub fn coils(&self) -> Outputs {
        self.outputs & Outputs::COILS
    }

    pub fn head_powered(&self) -> bool {
        !self.outputs.contains(Outputs::PWR_N)
    }

    pub fn paper_sense_on(&self) -> bool {
        self.outputs.contains(Outputs::PAPER_SENSE)
    }
}

fn tripped(threshold: Option<usize>, steps: usize) -> bool {
    threshold.is_some_and(|n| steps >= n)
}

impl HardwarePort for BenchPort {
    fn outputs(&self) -> Outputs {
        self.outputs
    }

    fn write_outputs(&mut self, next: Outputs) {
        let prev = self.outputs;
        let rose = next - prev;
        let fell = prev - next;

        if rose.contains(Outputs::CLK) {
            self.clocked_bits.push(next.contains(Outputs::MOSI));
        }
        if fell.contains(Outputs::LAT_N) {
            self.latches += 1;
        }
        let asserted = fell & Outputs::STROBES;
        if !asserted.is_empty() {
            self.strobe_pulses.push(asserted);
        }
        let coils = next & Outputs::COILS;
        if coils != prev & Outputs::COILS && !coils.is_empty() {
            self.steps += 1;
            self.coil_history.push(coils);
        }

        self.outputs = next;
    }

    fn inputs(&self) -> Inputs {
        let mut inputs = Inputs::ALARM_N;
        if self.thermal_now || tripped(self.thermal_after_steps, self.steps) {
            inputs -= Inputs::ALARM_N;
        }
        if tripped(self.paper_out_after_steps, self.steps) {
            inputs |= Inputs::PAPER_OUT;
        }
        inputs
    }
}

// ── Virtual timer ───────────────────────────────────────────────────

/// Cycle counter that only advances when the firmware waits.
#[derive(Default)]
pub struct VirtualTimer {
    pub now: u64,
    deadline: Option<u64>,
    pub delays: Vec<u32>,
    pub compare_waits: Vec<u64>,
}

impl Timer for VirtualTimer {
    fn now(&self) -> u32 {
        self.now as u32
    }

    fn delay(&mut self, cycles: u32) {
        self.delays.push(cycles);
        self.now += u64::from(cycles);
    }

    fn arm_compare(&mut self, cycles: u32) {
        self.deadline = Some(self.now + u64::from(cycles));
    }

    fn compare_matched(&self) -> bool {
        self.deadline.is_none_or(|d| self.now >= d)
    }

    fn disarm_compare(&mut self) {
        self.deadline = None;
    }

    fn wait_compare(&mut self) {
        if let Some(deadline) = self.deadline {
            self.now = self.now.max(deadline);
        }
        self.compare_waits.push(self.now);
        self.disarm_compare();
    }
}

pub type BenchProcessor = JobProcessor<BenchPort, VirtualTimer>;

pub fn processor() -> BenchProcessor {
    JobProcessor::new(
        BenchPort::new(),
        VirtualTimer::default(),
        ProcessorConfig::default(),
    )
}

pub fn processor_with(port: BenchPort) -> BenchProcessor {
    JobProcessor::new(port, VirtualTimer::default(), ProcessorConfig::default())
}

// ── Scripted host ───────────────────────────────────────────────────

/// Host side that hands over one queued batch per submission.
pub struct ScriptedHost {
    pub memory: Vec<u8>,
    pending: VecDeque<Batch>,
    pub acknowledged: usize,
    pub completions: usize,
    pub powered_down: bool,
}

impl ScriptedHost {
    pub fn new(memory_size: usize, batches: Vec<Batch>) -> Self {
        Self {
            memory: vec![0u8; memory_size],
            pending: batches.into(),
            acknowledged: 0,
            completions: 0,
            powered_down: false,
        }
    }
}

impl HostLink for ScriptedHost {
    fn wait_for_submission(&mut self) {
        let batch = self
            .pending
            .pop_front()
            .expect("session waited for a batch the test never queued");
        let region = &mut self.memory[STATUS_SIZE..];
        region.fill(0);
        region[..batch.bytes().len()].copy_from_slice(batch.bytes());
    }

    fn acknowledge_submission(&mut self) {
        self.acknowledged += 1;
    }

    fn signal_completion(&mut self) {
        self.completions += 1;
    }

    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, LayoutError> {
        let mut view = QueueView::new(&mut self.memory)?;
        Ok(f(&mut view))
    }

    fn power_down(&mut self) {
        self.powered_down = true;
    }
}
