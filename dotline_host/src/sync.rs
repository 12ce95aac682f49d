//! Session Synchronizer.
//!
//! The host writes a batch while the coprocessor is idle, raises the
//! submission signal, then blocks on the completion signal with no
//! timeout. Status is read after every batch and never cleared.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::HostError;
use dotline_common::{PrinterStatus, QueueView};
use tracing::{debug, info, warn};

/// Host side of the coprocessor boundary.
pub trait Coprocessor {
    /// Run `f` over the shared queue. Only called while the coprocessor is
    /// idle.
    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, HostError>;

    /// Raise the submission signal.
    fn submit(&mut self) -> Result<(), HostError>;

    /// Block until the completion signal, then clear it.
    fn wait_completion(&mut self) -> Result<(), HostError>;

    /// Release the coprocessor once no further batches will be sent.
    fn shutdown(&mut self) -> Result<(), HostError>;
}

impl<C: Coprocessor> Coprocessor for &mut C {
    fn with_queue<R>(&mut self, f: impl FnOnce(&mut QueueView<'_>) -> R) -> Result<R, HostError> {
        (**self).with_queue(f)
    }

    fn submit(&mut self) -> Result<(), HostError> {
        (**self).submit()
    }

    fn wait_completion(&mut self) -> Result<(), HostError> {
        (**self).wait_completion()
    }

    fn shutdown(&mut self) -> Result<(), HostError> {
        (**self).shutdown()
    }
}

/// Result of one submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Status word after the batch. Includes flags from earlier batches.
    pub status: PrinterStatus,
    /// Wall time from submission to completion.
    pub elapsed: Duration,
}

/// Submits batches and reports status changes.
#[derive(Debug, Default)]
pub struct Synchronizer {
    batches: usize,
    total: Duration,
    reported: PrinterStatus,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches completed so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Summed submission-to-completion time.
    pub fn total_elapsed(&self) -> Duration {
        self.total
    }

    /// Submit the batch already written to the queue and wait for it.
    pub fn run_batch<C: Coprocessor>(&mut self, coprocessor: &mut C) -> Result<BatchOutcome, HostError> {
        debug!("Initiating section printing");
        let start = Instant::now();
        coprocessor.submit()?;
        debug!("Waiting for printer driver...");
        coprocessor.wait_completion()?;
        let elapsed = start.elapsed();

        self.batches += 1;
        self.total += elapsed;
        info!(batch = self.batches, "Elapsed time: {} ms", elapsed.as_millis());

        let status = coprocessor.with_queue(|queue| queue.status())?;
        self.report(status);
        Ok(BatchOutcome { status, elapsed })
    }

    /// Submit without waiting. For batches that never complete.
    pub fn submit_detached<C: Coprocessor>(&mut self, coprocessor: &mut C) -> Result<(), HostError> {
        info!("Submitting batch without waiting for completion");
        coprocessor.submit()
    }

    /// Log flags that appeared since the last report. Flags stay set in
    /// the register; only their first appearance is a warning.
    fn report(&mut self, status: PrinterStatus) {
        let fresh = status - self.reported;
        for message in fresh.describe() {
            warn!(status = status.bits(), "{message}!");
        }
        if fresh.halt_requested() {
            debug!("Coprocessor acknowledged halt request");
        }
        self.reported = status;
    }
}

/// Final status summary for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    status: PrinterStatus,
}

impl StatusReport {
    pub fn new(status: PrinterStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> PrinterStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        !self.status.has_error()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(f, "Job completed successfully");
        }
        let mut first = true;
        for message in self.status.describe() {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{message}!")?;
            first = false;
        }
        Ok(())
    }
}
