//! Integration test: the coprocessor session loop.
//!
//! Drives `Session::run` with a scripted host that hands over one batch per
//! submission, then checks signalling, sticky status and shutdown.

use dotline_common::geometry::{MAX_HALF_STEPS, STATUS_SIZE};
use dotline_common::{LayoutError, PrinterStatus};
use dotline_firmware::port::{HardwarePort, Outputs};
use dotline_firmware::processor::{BatchEnd, JobProcessor, ProcessorConfig};
use dotline_firmware::session::Session;
use dotline_firmware::timing::HeadTiming;

use super::support::{Batch, BenchPort, ScriptedHost, VirtualTimer, black_line};

const MEMORY: usize = 512;

#[test]
fn session_serves_batches_until_halt() {
    let mut host = ScriptedHost::new(
        MEMORY,
        vec![
            Batch::new().open().line(&black_line(3)).steps(1).eos(),
            Batch::new().steps(2).eos(),
            Batch::new().close().halt().eos(),
        ],
    );
    let mut port = BenchPort::new();
    let mut timer = VirtualTimer::default();

    let processor = JobProcessor::new(&mut port, &mut timer, ProcessorConfig::default());
    let summary = Session::new(&mut host, processor).run().unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.final_status, PrinterStatus::HALT_REQUESTED);
    assert_eq!(
        summary.last_batch.map(|r| r.end),
        Some(BatchEnd::EndOfSequence)
    );
    assert_eq!(host.acknowledged, 3);
    assert_eq!(host.completions, 3);
    assert!(host.powered_down);
    assert_eq!(port.steps, 3);
    assert_eq!(port.outputs(), Outputs::SAFE);
    assert_eq!(
        timer.delays.last().copied(),
        Some(HeadTiming::DATASHEET.shutdown)
    );
}

#[test]
fn status_is_zeroed_once_at_session_start() {
    let mut host = ScriptedHost::new(MEMORY, vec![Batch::new().halt().eos()]);
    host.memory[..STATUS_SIZE].copy_from_slice(&0xFFu32.to_le_bytes());
    let mut port = BenchPort::new();
    let mut timer = VirtualTimer::default();

    let processor = JobProcessor::new(&mut port, &mut timer, ProcessorConfig::default());
    let summary = Session::new(&mut host, processor).run().unwrap();

    assert_eq!(summary.final_status, PrinterStatus::HALT_REQUESTED);
}

#[test]
fn errors_accumulate_over_the_whole_session() {
    let mut host = ScriptedHost::new(
        MEMORY,
        vec![
            Batch::new().steps(MAX_HALF_STEPS + 1).eos(),
            Batch::new().raw(0x77, &[]).eos(),
            Batch::new().open().close().halt().eos(),
        ],
    );
    let mut port = BenchPort::new();
    let mut timer = VirtualTimer::default();

    let processor = JobProcessor::new(&mut port, &mut timer, ProcessorConfig::default());
    let summary = Session::new(&mut host, processor).run().unwrap();

    assert_eq!(
        summary.final_status,
        PrinterStatus::ILLEGAL_PARAMETER
            | PrinterStatus::ILLEGAL_COMMAND
            | PrinterStatus::HALT_REQUESTED
    );
}

#[test]
fn halt_skipped_by_an_aborted_batch_does_not_end_session() {
    let mut host = ScriptedHost::new(
        MEMORY,
        vec![
            Batch::new().raw(0x10, &[]).halt().eos(),
            Batch::new().halt().eos(),
        ],
    );
    let mut port = BenchPort::new();
    let mut timer = VirtualTimer::default();

    let processor = JobProcessor::new(&mut port, &mut timer, ProcessorConfig::default());
    let summary = Session::new(&mut host, processor).run().unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(host.completions, 2);
}

#[test]
fn undersized_shared_memory_is_rejected_before_any_batch() {
    let mut host = ScriptedHost::new(STATUS_SIZE + 4, vec![]);
    let mut port = BenchPort::new();
    let mut timer = VirtualTimer::default();

    let processor = JobProcessor::new(&mut port, &mut timer, ProcessorConfig::default());
    let result = Session::new(&mut host, processor).run();

    assert!(matches!(result, Err(LayoutError { size: 8, .. })));
    assert_eq!(host.acknowledged, 0);
    assert!(!host.powered_down);
}
