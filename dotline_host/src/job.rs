//! Print job composition.
//!
//! Every job opens the head, queues its work through the [`QueueWriter`]
//! and ends with the writer's flush (Close, Halt-Request, EOS), so the
//! coprocessor session halts once the job is done. Test-Signals is the
//! exception: it never completes and is submitted detached.

use std::ops::RangeInclusive;

use crate::bitmap::MonoBitmap;
use crate::error::HostError;
use crate::partition::LinePartitioner;
use crate::sync::Coprocessor;
use crate::writer::QueueWriter;
use dotline_common::geometry::DOTS_PER_LINE;
use dotline_common::{Command, PrinterStatus};
use tracing::{info, warn};

/// Inclusive range of image rows to print.
///
/// `end` is the last row printed, not one past it, so `-e` names a row the
/// user can see in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    /// Fill in defaults (first and last row) and check against `height`.
    pub fn resolve(start: Option<u32>, end: Option<u32>, height: u32) -> Result<Self, HostError> {
        let Some(last) = height.checked_sub(1) else {
            return Err(HostError::InvalidRowRange("image has no rows".to_string()));
        };
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(last);

        if start > last {
            return Err(HostError::InvalidRowRange(format!(
                "Invalid start line! {start} is past the last row {last}"
            )));
        }
        if end > last {
            return Err(HostError::InvalidRowRange(format!(
                "Invalid end line! {end} is past the last row {last}"
            )));
        }
        if start > end {
            return Err(HostError::InvalidRowRange(format!(
                "The start line must not be larger than the end line! ({start} > {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn rows(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// How to print an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub rows: RowRange,
    pub invert: bool,
    /// Extra half-steps fed after the last row.
    pub feed_after: u32,
}

/// What a print job queued and how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintSummary {
    pub rows: u32,
    pub passes: usize,
    pub batches: usize,
    pub status: PrinterStatus,
}

/// Print `options.rows` of `bitmap`, then halt the session.
pub fn print_image<C: Coprocessor>(
    writer: &mut QueueWriter<C>,
    partitioner: &LinePartitioner,
    bitmap: &MonoBitmap,
    options: &PrintOptions,
) -> Result<PrintSummary, HostError> {
    if bitmap.width() as usize > DOTS_PER_LINE {
        warn!(
            width = bitmap.width(),
            "Image width exceeds the maximum number of dots allowed per line! \
             Will only be printing the first {DOTS_PER_LINE} pixels"
        );
    }
    info!(
        start = options.rows.start,
        end = options.rows.end,
        invert = options.invert,
        "Processing image and starting print job"
    );

    let width = bitmap.width() as usize;
    writer.append(Command::Open, &[])?;
    let mut passes = 0;
    for y in options.rows.rows() {
        passes += partitioner.partition_row(bitmap.row(y), width, options.invert, writer)?;
    }
    if options.feed_after > 0 {
        writer.append(Command::MotorHalfStep, &options.feed_after.to_le_bytes())?;
    }
    let status = writer.flush()?;

    Ok(PrintSummary {
        rows: options.rows.len(),
        passes,
        batches: writer.synchronizer().batches(),
        status,
    })
}

/// Feed `count` half-steps of paper, then halt the session.
pub fn feed_paper<C: Coprocessor>(
    writer: &mut QueueWriter<C>,
    count: u32,
) -> Result<PrinterStatus, HostError> {
    info!(count, "Start feeding paper");
    writer.append(Command::Open, &[])?;
    writer.append(Command::MotorHalfStep, &count.to_le_bytes())?;
    writer.flush()
}

/// Start the diagnostic output pattern. Never completes; only run with no
/// head attached.
pub fn start_test_signals<C: Coprocessor>(writer: &mut QueueWriter<C>) -> Result<(), HostError> {
    warn!("Starting test pattern signal generation. Use only with no printer hardware connected");
    writer.begin()?;
    writer.append(Command::TestSignals, &[])?;
    writer.submit_detached()
}
