//! Line Partitioner.
//!
//! Splits one image row into as many Print-Line passes as the per-strobe
//! black-dot budget requires, then advances the paper by one half-step.
//! All passes of a row land on the same paper line.

use crate::error::HostError;
use dotline_common::Command;
use dotline_common::geometry::{BYTES_PER_LINE, DOTS_PER_LINE, MAX_BLACK_DOTS_PER_LINE};

/// Destination for encoded job items.
pub trait JobSink {
    fn emit(&mut self, command: Command, payload: &[u8]) -> Result<(), HostError>;
}

impl<S: JobSink> JobSink for &mut S {
    fn emit(&mut self, command: Command, payload: &[u8]) -> Result<(), HostError> {
        (**self).emit(command, payload)
    }
}

/// One head line of dot data plus its black-dot count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    dots: [u8; BYTES_PER_LINE],
    black: usize,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            dots: [0; BYTES_PER_LINE],
            black: 0,
        }
    }

    /// Mark dot `index` (0-based, MSB first) black.
    #[inline]
    pub fn set(&mut self, index: usize) {
        let mask = 0x80 >> (index % 8);
        let byte = &mut self.dots[index / 8];
        if *byte & mask == 0 {
            *byte |= mask;
            self.black += 1;
        }
    }

    #[inline]
    pub const fn black_count(&self) -> usize {
        self.black
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.black == 0
    }

    pub const fn as_bytes(&self) -> &[u8; BYTES_PER_LINE] {
        &self.dots
    }

    pub fn clear(&mut self) {
        self.dots = [0; BYTES_PER_LINE];
        self.black = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits rows into strobe passes of at most `max_black_dots` black dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePartitioner {
    max_black_dots: usize,
    max_width: usize,
}

impl LinePartitioner {
    /// A budget of zero is treated as one dot per pass.
    pub fn new(max_black_dots: usize) -> Self {
        Self {
            max_black_dots: max_black_dots.max(1),
            max_width: DOTS_PER_LINE,
        }
    }

    pub const fn max_black_dots(&self) -> usize {
        self.max_black_dots
    }

    /// Encode one row into `sink`.
    ///
    /// `row` is MSB-first bit-packed with `width` valid bits. Bits past the
    /// head width are dropped. Returns the number of Print-Line passes
    /// emitted, which is zero for a row with no black dots.
    pub fn partition_row<S: JobSink>(
        &self,
        row: &[u8],
        width: usize,
        invert: bool,
        sink: &mut S,
    ) -> Result<usize, HostError> {
        let limit = width.min(self.max_width).min(row.len() * 8);
        let mut line = LineBuffer::new();
        let mut passes = 0;

        for x in 0..limit {
            let bit = row[x / 8] & (0x80 >> (x % 8)) != 0;
            if bit == invert {
                continue;
            }
            line.set(x);
            if line.black_count() >= self.max_black_dots {
                sink.emit(Command::PrintLine, line.as_bytes())?;
                line.clear();
                passes += 1;
            }
        }

        if !line.is_empty() {
            sink.emit(Command::PrintLine, line.as_bytes())?;
            passes += 1;
        }

        sink.emit(Command::MotorHalfStep, &1u32.to_le_bytes())?;
        Ok(passes)
    }
}

impl Default for LinePartitioner {
    fn default() -> Self {
        Self::new(MAX_BLACK_DOTS_PER_LINE)
    }
}

/// Sink that keeps every emitted item in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub items: Vec<(Command, Vec<u8>)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads of every Print-Line item, in order.
    pub fn print_lines(&self) -> impl Iterator<Item = &[u8]> {
        self.items
            .iter()
            .filter(|(command, _)| *command == Command::PrintLine)
            .map(|(_, payload)| payload.as_slice())
    }

    pub fn count(&self, command: Command) -> usize {
        self.items.iter().filter(|(c, _)| *c == command).count()
    }
}

impl JobSink for RecordingSink {
    fn emit(&mut self, command: Command, payload: &[u8]) -> Result<(), HostError> {
        self.items.push((command, payload.to_vec()));
        Ok(())
    }
}

/// Number of set bits in a packed line.
pub fn black_dots(line: &[u8]) -> usize {
    line.iter().map(|b| b.count_ones() as usize).sum()
}
