//! Shared job queue layout.
//!
//! The shared memory block is `[status: u32][batch region: N bytes]`. The
//! host writes the batch region only while the coprocessor is idle; the
//! coprocessor writes the status word only while the host waits for the
//! completion signal. That alternation is the whole synchronization scheme,
//! so a `QueueView` is just a borrowed byte slice with typed accessors.

use crate::geometry::{ITEM_HEADER_SIZE, STATUS_SIZE};
use crate::status::PrinterStatus;
use thiserror::Error;

/// Shared memory block that cannot hold a status word and one EOS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("shared memory of {size} bytes is smaller than the minimum of {minimum} bytes")]
pub struct LayoutError {
    /// Provided size.
    pub size: usize,
    /// Smallest usable size.
    pub minimum: usize,
}

/// Smallest shared block: status word plus a single EOS item.
pub const MIN_QUEUE_SIZE: usize = STATUS_SIZE + ITEM_HEADER_SIZE;

/// Typed view over the shared job queue memory.
#[derive(Debug)]
pub struct QueueView<'a> {
    memory: &'a mut [u8],
}

impl<'a> QueueView<'a> {
    /// Wrap a shared memory block.
    ///
    /// # Errors
    /// Returns `LayoutError` if the block is smaller than [`MIN_QUEUE_SIZE`].
    pub fn new(memory: &'a mut [u8]) -> Result<Self, LayoutError> {
        if memory.len() < MIN_QUEUE_SIZE {
            return Err(LayoutError {
                size: memory.len(),
                minimum: MIN_QUEUE_SIZE,
            });
        }
        Ok(Self { memory })
    }

    /// Capacity C of the batch region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.memory.len() - STATUS_SIZE
    }

    /// Current status flags.
    #[inline]
    pub fn status(&self) -> PrinterStatus {
        read_status(&self.memory[..STATUS_SIZE])
    }

    /// Batch region, read-only.
    #[inline]
    pub fn region(&self) -> &[u8] {
        &self.memory[STATUS_SIZE..]
    }

    /// Batch region, writable. Host side only, while the coprocessor is idle.
    #[inline]
    pub fn region_mut(&mut self) -> &mut [u8] {
        &mut self.memory[STATUS_SIZE..]
    }

    /// Status register handle. Coprocessor side only.
    #[inline]
    pub fn status_register(&mut self) -> StatusRegister<'_> {
        StatusRegister {
            word: &mut self.memory[..STATUS_SIZE],
        }
    }

    /// Split into the status register and the read-only batch region so the
    /// interpreter can raise flags while borrowing item payloads.
    #[inline]
    pub fn split(&mut self) -> (StatusRegister<'_>, &[u8]) {
        let (word, region) = self.memory.split_at_mut(STATUS_SIZE);
        (StatusRegister { word }, region)
    }
}

/// Write handle for the sticky status word.
///
/// Flags can only be added. The sole clearing path is [`StatusRegister::reset`],
/// reserved for coprocessor session initialization.
#[derive(Debug)]
pub struct StatusRegister<'a> {
    word: &'a mut [u8],
}

impl StatusRegister<'_> {
    /// Current flags.
    #[inline]
    pub fn read(&self) -> PrinterStatus {
        read_status(self.word)
    }

    /// OR `flags` into the status word.
    #[inline]
    pub fn raise(&mut self, flags: PrinterStatus) {
        let value = self.read() | flags;
        self.word.copy_from_slice(&value.bits().to_le_bytes());
    }

    /// Zero the status word. Called once when the coprocessor session starts.
    #[inline]
    pub fn reset(&mut self) {
        self.word.fill(0);
    }
}

#[inline]
fn read_status(word: &[u8]) -> PrinterStatus {
    let mut bytes = [0u8; STATUS_SIZE];
    bytes.copy_from_slice(word);
    PrinterStatus::from_bits_retain(u32::from_le_bytes(bytes))
}
