//! Integration test: one batch through the Job Processor.
//!
//! Covers protocol faults, interlock aborts, and the quiet skipping of
//! malformed payloads.

use dotline_common::geometry::{BYTES_PER_LINE, MAX_HALF_STEPS, STATUS_SIZE};
use dotline_common::{Command, ItemError, PrinterStatus, QueueView};
use dotline_firmware::motor::{Interlock, PHASE_TABLE};
use dotline_firmware::port::Outputs;
use dotline_firmware::processor::{AbortCause, BatchEnd, BatchReport};
use dotline_firmware::timing::HeadTiming;

use super::support::{BenchPort, BenchProcessor, Batch, black_line, memory_with, processor, processor_with};

// ── Helpers ─────────────────────────────────────────────────────────

fn run(processor: &mut BenchProcessor, batch: &Batch) -> (BatchReport, PrinterStatus) {
    let mut memory = memory_with(batch, 1024);
    let mut queue = QueueView::new(&mut memory).unwrap();
    let report = processor.process_batch(&mut queue);
    (report, queue.status())
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn half_step_count_over_limit_sets_illegal_parameter_and_does_not_step() {
    let mut p = processor();
    let batch = Batch::new()
        .open()
        .steps(MAX_HALF_STEPS + 1)
        .close()
        .eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(status, PrinterStatus::ILLEGAL_PARAMETER);
    assert_eq!(p.port().steps, 0);
    assert_eq!(report.end, BatchEnd::EndOfSequence);
    assert_eq!(report.items_executed, 3);
}

#[test]
fn half_step_count_at_limit_is_accepted() {
    let mut p = processor();
    let batch = Batch::new().open().steps(MAX_HALF_STEPS).eos();
    let (_, status) = run(&mut p, &batch);
    assert!(status.is_empty());
    assert_eq!(p.port().steps, MAX_HALF_STEPS as usize);
}

#[test]
fn thermal_trip_on_fifth_step_aborts_rest_of_batch() {
    let mut port = BenchPort::new();
    port.thermal_after_steps = Some(4);
    let mut p = processor_with(port);
    let batch = Batch::new().open().steps(10).close().halt().eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(p.port().steps, 4);
    assert_eq!(status, PrinterStatus::THERMAL_ALARM);
    assert_eq!(
        report.end,
        BatchEnd::Aborted(AbortCause::Interlock(Interlock::ThermalAlarm))
    );
    assert_eq!(report.items_executed, 1);
    // Close never ran: head and sensor supply are still on.
    assert!(p.port().head_powered());
    assert!(p.port().paper_sense_on());
    assert!(p.port().coils().is_empty());
}

#[test]
fn paper_out_after_a_step_releases_coils() {
    let mut port = BenchPort::new();
    port.paper_out_after_steps = Some(1);
    let mut p = processor_with(port);
    let batch = Batch::new().open().steps(3).eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(p.port().steps, 1);
    assert_eq!(status, PrinterStatus::PAPER_OUT);
    assert!(p.port().coils().is_empty());
    assert_eq!(p.stepper().phase(), 0);
    assert_eq!(
        report.end,
        BatchEnd::Aborted(AbortCause::Interlock(Interlock::PaperOut))
    );
}

#[test]
fn open_with_hot_driver_ends_batch() {
    let mut port = BenchPort::new();
    port.thermal_now = true;
    let mut p = processor_with(port);
    let batch = Batch::new().open().line(&black_line(8)).eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(status, PrinterStatus::THERMAL_ALARM);
    assert_eq!(report.items_executed, 0);
    assert!(p.port().clocked_bits.is_empty());
}

#[test]
fn unknown_command_aborts_before_later_items() {
    let mut p = processor();
    let batch = Batch::new().open().raw(0x42, &[1, 2, 3]).halt().eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(status, PrinterStatus::ILLEGAL_COMMAND);
    assert!(!status.halt_requested());
    assert_eq!(report.end, BatchEnd::Aborted(AbortCause::IllegalCommand(0x42)));
    assert_eq!(report.items_executed, 1);
}

#[test]
fn mismatched_payloads_are_skipped_without_flags() {
    let mut p = processor();
    let batch = Batch::new()
        .open()
        .line(&[0xFF; BYTES_PER_LINE - 1])
        .raw(Command::MotorHalfStep.code(), &[5, 0])
        .steps(2)
        .eos();

    let (report, status) = run(&mut p, &batch);

    assert!(status.is_empty());
    assert!(p.port().clocked_bits.is_empty());
    assert_eq!(p.port().steps, 2);
    assert_eq!(report.items_executed, 4);
}

#[test]
fn print_line_shifts_latches_and_strobes() {
    let mut p = processor();
    let batch = Batch::new().open().line(&black_line(10)).eos();

    let (_, status) = run(&mut p, &batch);

    assert!(status.is_empty());
    let port = p.port();
    assert_eq!(port.clocked_bits.len(), 384);
    assert_eq!(port.clocked_bits.iter().filter(|b| **b).count(), 10);
    assert_eq!(port.latches, 1);
    assert_eq!(
        port.strobe_pulses,
        vec![Outputs::STB1_N, Outputs::STB23_N, Outputs::STB4_N, Outputs::STB56_N]
    );
}

#[test]
fn overfull_line_is_clipped_and_flagged() {
    let mut p = processor();
    let batch = Batch::new().open().line(&black_line(100)).steps(1).eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(status, PrinterStatus::TOO_MANY_BLACK_DOTS);
    assert_eq!(p.port().clocked_bits.iter().filter(|b| **b).count(), 64);
    // The batch carries on.
    assert_eq!(report.end, BatchEnd::EndOfSequence);
    assert_eq!(p.port().steps, 1);
}

#[test]
fn halt_request_lets_batch_finish() {
    let mut p = processor();
    let batch = Batch::new().halt().open().steps(2).close().eos();

    let (report, status) = run(&mut p, &batch);

    assert_eq!(status, PrinterStatus::HALT_REQUESTED);
    assert_eq!(report.items_executed, 4);
    assert_eq!(p.port().steps, 2);
    assert!(!p.port().head_powered());
}

#[test]
fn close_powers_down_and_releases_motor() {
    let mut p = processor();
    let batch = Batch::new().open().steps(3).close().eos();
    run(&mut p, &batch);
    let port = p.port();
    assert!(!port.head_powered());
    assert!(!port.paper_sense_on());
    assert!(port.coils().is_empty());
    assert_eq!(p.stepper().phase(), 0);
}

#[test]
fn motor_phase_persists_across_items() {
    let mut p = processor();
    let batch = Batch::new().open().steps(3).steps(6).eos();
    run(&mut p, &batch);

    let expected: Vec<Outputs> = PHASE_TABLE.iter().cycle().take(9).copied().collect();
    assert_eq!(p.port().coil_history, expected);
    assert_eq!(p.stepper().phase(), 1);
}

#[test]
fn steps_are_spaced_by_half_step_deadline() {
    let mut p = processor();
    let batch = Batch::new().open().steps(5).eos();
    run(&mut p, &batch);

    let waits = &p.timer().compare_waits;
    assert_eq!(waits.len(), 5);
    let half_step = u64::from(HeadTiming::DATASHEET.half_step);
    assert!(waits.windows(2).all(|w| w[1] - w[0] >= half_step));
}

#[test]
fn printing_between_feeds_counts_toward_step_interval() {
    let mut p = processor();
    // One printed line takes four 1 ms strobes, longer than a half-step.
    let batch = Batch::new().open().steps(1).line(&black_line(1)).steps(1).eos();
    run(&mut p, &batch);

    let waits = &p.timer().compare_waits;
    let elapsed_after_line = waits[1] - waits[0];
    assert!(elapsed_after_line > u64::from(HeadTiming::DATASHEET.half_step));
}

#[test]
fn item_running_past_region_is_an_illegal_command() {
    let capacity = 32;
    let mut memory = vec![0u8; STATUS_SIZE + capacity];
    let region = &mut memory[STATUS_SIZE..];
    region[0..4].copy_from_slice(&Command::PrintLine.code().to_le_bytes());
    region[4..8].copy_from_slice(&(BYTES_PER_LINE as u32).to_le_bytes());

    let mut p = processor();
    let mut queue = QueueView::new(&mut memory).unwrap();
    let report = p.process_batch(&mut queue);

    assert_eq!(queue.status(), PrinterStatus::ILLEGAL_COMMAND);
    assert_eq!(
        report.end,
        BatchEnd::Aborted(AbortCause::Overrun(ItemError::PayloadOutOfBounds {
            offset: 0,
            length: BYTES_PER_LINE as u32,
            capacity,
        }))
    );
}

#[test]
fn flags_accumulate_across_batches() {
    let mut p = processor();
    let mut memory = memory_with(&Batch::new().steps(MAX_HALF_STEPS + 5).eos(), 256);
    {
        let mut queue = QueueView::new(&mut memory).unwrap();
        p.process_batch(&mut queue);
    }

    let clean = Batch::new().open().steps(1).close().eos();
    memory[STATUS_SIZE..STATUS_SIZE + clean.bytes().len()].copy_from_slice(clean.bytes());
    let mut queue = QueueView::new(&mut memory).unwrap();
    let report = p.process_batch(&mut queue);

    assert_eq!(report.end, BatchEnd::EndOfSequence);
    assert_eq!(queue.status(), PrinterStatus::ILLEGAL_PARAMETER);
}
