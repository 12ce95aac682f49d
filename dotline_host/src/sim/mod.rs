//! Simulated coprocessor.
//!
//! Runs the real firmware [`Session`](dotline_firmware::Session) on a
//! worker thread. The shared block is a mutex-guarded buffer, the two edge
//! signals are [`EventLine`]s, and the head behind the core registers is a
//! [`SimulatedHead`] that records burned dots on a [`PaperLog`].

mod coprocessor;
mod event;
mod head;
mod timer;

pub use coprocessor::SimulatedCoprocessor;
pub use event::EventLine;
pub use head::{PaperLog, SensorTrips, SimulatedHead};
pub use timer::{SimTimer, cycles_to_duration};
