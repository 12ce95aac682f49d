//! Job Processor.
//!
//! Walks one batch item by item, from offset 0 to the first EOS, driving the
//! head and the stepper. Protocol and interlock faults are reported only
//! through the sticky status register; they end the batch, never the
//! session.

use crate::head::PrintHead;
use crate::motor::{Interlock, Stepper};
use crate::port::HardwarePort;
use crate::timing::{HeadTiming, Timer};
use dotline_common::geometry::{BYTES_PER_LINE, MAX_BLACK_DOTS_PER_LINE, MAX_HALF_STEPS};
use dotline_common::item::{ItemError, RawItem, read_item};
use dotline_common::{Command, PrinterStatus, QueueView, StatusRegister};

/// One decoded job item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    Open,
    /// `None` when the payload is not exactly one line; such items are skipped.
    PrintLine(Option<&'a [u8; BYTES_PER_LINE]>),
    /// `None` when the payload is not exactly one u32; such items are skipped.
    MotorHalfStep(Option<u32>),
    TestSignals,
    Close,
    HaltRequest,
    EndOfSequence,
    Unknown(u32),
}

impl<'a> Instruction<'a> {
    pub fn decode(item: &RawItem<'a>) -> Self {
        let Some(command) = item.known_command() else {
            return Self::Unknown(item.command);
        };
        match command {
            Command::Open => Self::Open,
            Command::PrintLine => Self::PrintLine(item.payload.try_into().ok()),
            Command::MotorHalfStep => Self::MotorHalfStep(
                <[u8; 4]>::try_from(item.payload)
                    .ok()
                    .map(u32::from_le_bytes),
            ),
            Command::TestSignals => Self::TestSignals,
            Command::Close => Self::Close,
            Command::HaltRequest => Self::HaltRequest,
            Command::Eos => Self::EndOfSequence,
        }
    }
}

/// Why a batch stopped before its EOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    Interlock(Interlock),
    IllegalCommand(u32),
    /// An item would run past the end of the region.
    Overrun(ItemError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEnd {
    EndOfSequence,
    Aborted(AbortCause),
}

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Items run to completion before the batch ended. EOS is not counted.
    pub items_executed: usize,
    pub end: BatchEnd,
}

/// Fixed processing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub max_black_dots: usize,
    pub max_half_steps: u32,
    pub timing: HeadTiming,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_black_dots: MAX_BLACK_DOTS_PER_LINE,
            max_half_steps: MAX_HALF_STEPS,
            timing: HeadTiming::DATASHEET,
        }
    }
}

enum Flow {
    Next,
    End,
    Abort(AbortCause),
}

/// Batch interpreter owning the port, timer and motor state.
///
/// Motor phase and the armed step deadline persist across items and batches.
pub struct JobProcessor<P, T> {
    port: P,
    timer: T,
    head: PrintHead,
    stepper: Stepper,
    config: ProcessorConfig,
}

impl<P: HardwarePort, T: Timer> JobProcessor<P, T> {
    pub fn new(port: P, timer: T, config: ProcessorConfig) -> Self {
        Self {
            port,
            timer,
            head: PrintHead::new(config.timing, config.max_black_dots),
            stepper: Stepper::new(config.timing.half_step),
            config,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Drive every output to the unpowered state.
    pub fn reset_outputs(&mut self) {
        self.head.safe_outputs(&mut self.port);
    }

    /// Run the batch in `queue` until EOS or the first fault.
    pub fn process_batch(&mut self, queue: &mut QueueView<'_>) -> BatchReport {
        let (mut status, region) = queue.split();
        let mut offset = 0;
        let mut items_executed = 0;

        loop {
            let flow = match read_item(region, offset) {
                Ok(item) => {
                    offset = item.next_offset();
                    self.execute(Instruction::decode(&item), &mut status)
                }
                Err(e) => {
                    status.raise(PrinterStatus::ILLEGAL_COMMAND);
                    Flow::Abort(AbortCause::Overrun(e))
                }
            };

            let end = match flow {
                Flow::Next => {
                    items_executed += 1;
                    continue;
                }
                Flow::End => BatchEnd::EndOfSequence,
                Flow::Abort(cause) => BatchEnd::Aborted(cause),
            };
            return BatchReport {
                items_executed,
                end,
            };
        }
    }

    fn execute(&mut self, instruction: Instruction<'_>, status: &mut StatusRegister<'_>) -> Flow {
        let timing = *self.head.timing();
        match instruction {
            Instruction::Open => {
                self.head.safe_outputs(&mut self.port);
                self.timer.delay(timing.power_settle);
                self.head.power_on(&mut self.port, &mut self.timer);
                if let Err(interlock) = self.stepper.init(&mut self.port, &mut self.timer) {
                    status.raise(interlock.status_flag());
                    return Flow::Abort(AbortCause::Interlock(interlock));
                }
                Flow::Next
            }
            Instruction::PrintLine(Some(dots)) => {
                let clipped = self.head.print_line(&mut self.port, &mut self.timer, dots);
                if clipped > 0 {
                    status.raise(PrinterStatus::TOO_MANY_BLACK_DOTS);
                }
                Flow::Next
            }
            Instruction::PrintLine(None) | Instruction::MotorHalfStep(None) => Flow::Next,
            Instruction::MotorHalfStep(Some(count)) => {
                if count > self.config.max_half_steps {
                    status.raise(PrinterStatus::ILLEGAL_PARAMETER);
                    return Flow::Next;
                }
                for _ in 0..count {
                    if let Err(interlock) = self.stepper.half_step(&mut self.port, &mut self.timer)
                    {
                        status.raise(interlock.status_flag());
                        return Flow::Abort(AbortCause::Interlock(interlock));
                    }
                }
                Flow::Next
            }
            Instruction::TestSignals => self.head.run_test_signals(&mut self.port, &mut self.timer),
            Instruction::Close => {
                // Coils only; the stepper is re-initialized by the next Open.
                self.timer.delay(timing.power_settle);
                self.stepper.de_energize(&mut self.port);
                self.head.power_off(&mut self.port);
                Flow::Next
            }
            Instruction::HaltRequest => {
                status.raise(PrinterStatus::HALT_REQUESTED);
                Flow::Next
            }
            Instruction::EndOfSequence => Flow::End,
            Instruction::Unknown(code) => {
                status.raise(PrinterStatus::ILLEGAL_COMMAND);
                Flow::Abort(AbortCause::IllegalCommand(code))
            }
        }
    }
}
