//! # dotline Firmware
//!
//! Coprocessor side of the dotline thermal printer. Runs single-threaded and
//! run-to-completion: wait for the host's submission signal, interpret the
//! batch in shared memory, raise the completion signal, repeat until a halt
//! request has been processed.
//!
//! ## Layers
//!
//! 1. [`port`] - Hardware Port: named output/input signals over core registers
//! 2. [`timing`] - Cycle counter delays and the compare deadline
//! 3. [`head`] - Serial shift, latch and strobe sequencing
//! 4. [`motor`] - Half-step phase table and interlocks
//! 5. [`processor`] - Job item interpreter
//! 6. [`session`] - Submission/completion loop and shutdown
//!
//! ## Zero-Allocation
//!
//! Nothing here allocates. The shared queue is borrowed for the duration of
//! one batch and every buffer is a fixed-size array.

#![cfg_attr(not(test), no_std)]

pub mod head;
pub mod motor;
pub mod port;
pub mod processor;
pub mod session;
pub mod timing;

pub use head::PrintHead;
pub use motor::{Interlock, Stepper};
pub use port::{HardwarePort, Inputs, Outputs};
pub use processor::{BatchEnd, BatchReport, JobProcessor, ProcessorConfig};
pub use session::{HostLink, Session, SessionState};
pub use timing::{HeadTiming, Timer};
