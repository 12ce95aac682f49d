//! # dotline Host
//!
//! Host encoder for the dotline thermal printer. Turns a monochrome image
//! into job items, streams them through the fixed-size shared queue in as
//! many batches as needed, and reports the coprocessor's sticky status.
//!
//! # Module Structure
//!
//! - [`partition`] - Line Partitioner: rows to black-dot-limited passes
//! - [`writer`] - Queue Writer: cursor, EOS reservation, drain and retry
//! - [`sync`] - Session Synchronizer and the [`Coprocessor`] boundary
//! - [`sim`] - In-process coprocessor running the firmware session
//! - [`bitmap`] - 1-bit PNG loading
//! - [`job`] - Print, feed and test-signal jobs
//! - [`config`] - `dotline.toml`
//!
//! # Data Flow
//!
//! ```text
//! MonoBitmap ──► LinePartitioner ──► QueueWriter ──► shared queue
//!                                        │                │
//!                                        ▼                ▼
//!                                   Synchronizer ◄──► Coprocessor
//!                                  (submit / wait)   (Session loop)
//! ```

pub mod bitmap;
pub mod config;
pub mod error;
pub mod job;
pub mod partition;
pub mod sim;
pub mod sync;
pub mod writer;

pub use bitmap::MonoBitmap;
pub use config::HostConfig;
pub use error::HostError;
pub use partition::{JobSink, LineBuffer, LinePartitioner};
pub use sim::SimulatedCoprocessor;
pub use sync::{Coprocessor, StatusReport, Synchronizer};
pub use writer::QueueWriter;
