//! Queue Writer.
//!
//! Appends job items to the batch region behind a cursor. One item header
//! is always kept free for the terminating EOS. When an item does not fit,
//! the current batch is terminated, run to completion and reset before the
//! append is retried, so callers never see a full queue.

use crate::error::HostError;
use crate::partition::JobSink;
use crate::sync::{Coprocessor, Synchronizer};
use dotline_common::item::{ITEM_HEADER_SIZE, encoded_len, write_item};
use dotline_common::{Command, PrinterStatus};
use tracing::{debug, trace};

pub struct QueueWriter<C> {
    coprocessor: C,
    sync: Synchronizer,
    cursor: usize,
    capacity: usize,
    drains: usize,
    last_status: PrinterStatus,
}

impl<C: Coprocessor> QueueWriter<C> {
    /// Bind to `coprocessor` and start an empty batch.
    pub fn new(mut coprocessor: C) -> Result<Self, HostError> {
        let capacity = coprocessor.with_queue(|queue| queue.capacity())?;
        let mut writer = Self {
            coprocessor,
            sync: Synchronizer::new(),
            cursor: 0,
            capacity,
            drains: 0,
            last_status: PrinterStatus::empty(),
        };
        writer.begin()?;
        Ok(writer)
    }

    /// Reset to an empty batch (a lone EOS at offset 0).
    pub fn begin(&mut self) -> Result<(), HostError> {
        self.cursor = 0;
        self.terminate()
    }

    /// Append one item, draining the current batch first if it is full.
    pub fn append(&mut self, command: Command, payload: &[u8]) -> Result<(), HostError> {
        let size = encoded_len(payload.len());
        if size > self.limit() {
            return Err(HostError::ItemTooLarge {
                size,
                capacity: self.capacity,
            });
        }

        if self.cursor + size > self.limit() {
            debug!(cursor = self.cursor, size, "Batch region full, draining");
            self.drain()?;
        }

        let cursor = self.cursor;
        self.coprocessor
            .with_queue(|queue| write_item(queue.region_mut(), cursor, command, payload))?;
        trace!(?command, offset = cursor, size, "Appended job item");
        self.cursor += size;
        Ok(())
    }

    /// End the job: Close, Halt-Request and EOS, then submit and wait.
    ///
    /// Returns the status word after the final batch.
    pub fn flush(&mut self) -> Result<PrinterStatus, HostError> {
        self.append(Command::Close, &[])?;
        self.append(Command::HaltRequest, &[])?;
        self.terminate()?;
        if self.has_items() {
            self.run_batch()?;
        }
        self.cursor = 0;
        Ok(self.last_status)
    }

    /// Terminate the batch and submit it without waiting for completion.
    pub fn submit_detached(&mut self) -> Result<(), HostError> {
        self.terminate()?;
        self.sync.submit_detached(&mut self.coprocessor)?;
        self.cursor = 0;
        Ok(())
    }

    /// True if the current batch holds anything before its EOS.
    pub fn has_items(&self) -> bool {
        self.cursor > 0
    }

    /// Batches submitted because the region filled up.
    pub fn drain_count(&self) -> usize {
        self.drains
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Status read after the most recent completed batch.
    pub fn last_status(&self) -> PrinterStatus {
        self.last_status
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn coprocessor(&self) -> &C {
        &self.coprocessor
    }

    pub fn coprocessor_mut(&mut self) -> &mut C {
        &mut self.coprocessor
    }

    pub fn into_inner(self) -> C {
        self.coprocessor
    }

    /// Highest cursor that still leaves room for the EOS header.
    fn limit(&self) -> usize {
        self.capacity - ITEM_HEADER_SIZE
    }

    fn terminate(&mut self) -> Result<(), HostError> {
        let cursor = self.cursor;
        self.coprocessor
            .with_queue(|queue| write_item(queue.region_mut(), cursor, Command::Eos, &[]))?;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), HostError> {
        self.terminate()?;
        self.run_batch()?;
        self.drains += 1;
        self.begin()
    }

    fn run_batch(&mut self) -> Result<(), HostError> {
        let outcome = self.sync.run_batch(&mut self.coprocessor)?;
        self.last_status = outcome.status;
        Ok(())
    }
}

impl<C: Coprocessor> JobSink for QueueWriter<C> {
    fn emit(&mut self, command: Command, payload: &[u8]) -> Result<(), HostError> {
        self.append(command, payload)
    }
}
