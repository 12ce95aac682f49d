//! Whole jobs against the simulated coprocessor: the firmware session runs
//! on its own thread and the simulated head records what reaches the paper.

use dotline_common::PrinterStatus;
use dotline_common::geometry::BYTES_PER_LINE;
use dotline_host::config::SimulationConfig;
use dotline_host::job::{self, PrintOptions, RowRange};
use dotline_host::sync::Coprocessor;
use dotline_host::{HostError, LinePartitioner, MonoBitmap, QueueWriter, SimulatedCoprocessor};
use image::GenericImageView;

use super::support::{line_with, mono_png, simulated};

// ── Helpers ─────────────────────────────────────────────────────────

/// Eight full-width rows, row `y` black from dot `10 * y` for 70 dots.
fn staircase() -> Vec<Vec<u8>> {
    (0..8).map(|y| line_with(y * 10..y * 10 + 70).to_vec()).collect()
}

fn all_rows(height: u32) -> PrintOptions {
    PrintOptions {
        rows: RowRange::resolve(None, None, height).unwrap(),
        invert: false,
        feed_after: 0,
    }
}

fn print(
    coprocessor: SimulatedCoprocessor,
    bitmap: &MonoBitmap,
    options: &PrintOptions,
) -> (SimulatedCoprocessor, job::PrintSummary) {
    let mut writer = QueueWriter::new(coprocessor).unwrap();
    let summary =
        job::print_image(&mut writer, &LinePartitioner::default(), bitmap, options).unwrap();
    let mut coprocessor = writer.into_inner();
    coprocessor.shutdown().unwrap();
    (coprocessor, summary)
}

// ── Printing ────────────────────────────────────────────────────────

#[test]
fn monochrome_png_decodes_to_packed_rows() {
    let rows = vec![vec![0xA5, 0x80], vec![0x00, 0x7F]];
    let bitmap = MonoBitmap::from_png_bytes(&mono_png(16, 2, &rows)).unwrap();

    assert_eq!((bitmap.width(), bitmap.height()), (16, 2));
    assert_eq!(bitmap.row(0), &[0xA5, 0x80]);
    assert_eq!(bitmap.row(1), &[0x00, 0x7F]);
}

#[test]
fn png_prints_row_for_row_across_drained_batches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("staircase.png");
    std::fs::write(&path, mono_png(384, 8, &staircase())).unwrap();
    let bitmap = MonoBitmap::load(&path).unwrap();
    let options = PrintOptions {
        feed_after: 3,
        ..all_rows(bitmap.height())
    };

    let (coprocessor, summary) = print(simulated(300, SimulationConfig::default()), &bitmap, &options);

    assert!(!summary.status.has_error(), "{:?}", summary.status);
    assert!(summary.status.contains(PrinterStatus::HALT_REQUESTED));
    assert_eq!(summary.passes, 16);
    assert!(summary.batches > 1);

    let paper = coprocessor.paper();
    assert_eq!(paper.position(), 8 + 3);
    assert_eq!(paper.rows().len(), 8);
    for (y, row) in paper.rows().iter().enumerate() {
        assert_eq!(row, &line_with(y * 10..y * 10 + 70), "row {y}");
    }
    assert_eq!(paper.black_dots(), 8 * 70);
    assert_eq!(paper.overcurrent_passes(), 0);

    let session = coprocessor.summary().expect("halted session is joined");
    assert_eq!(session.batches, summary.batches);
    assert!(!session.final_status.has_error());
}

#[test]
fn inverted_row_range_burns_the_unset_bits() {
    let bitmap = MonoBitmap::from_packed(16, 4, [0xF0, 0x0F].repeat(4));
    let options = PrintOptions {
        rows: RowRange::resolve(Some(2), Some(3), 4).unwrap(),
        invert: true,
        feed_after: 0,
    };

    let (coprocessor, summary) = print(simulated(1024, SimulationConfig::default()), &bitmap, &options);

    assert_eq!(summary.rows, 2);
    let paper = coprocessor.paper();
    assert_eq!(paper.position(), 2);
    let mut expected = [0u8; BYTES_PER_LINE];
    expected[..2].copy_from_slice(&[0x0F, 0xF0]);
    assert_eq!(paper.rows(), &[expected, expected]);
}

#[test]
fn preview_png_shows_burned_dots_black() {
    let bitmap = MonoBitmap::from_packed(384, 1, line_with(0..4).to_vec());
    let (coprocessor, _) = print(simulated(512, SimulationConfig::default()), &bitmap, &all_rows(1));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preview.png");
    coprocessor.paper().save_png(&path).unwrap();

    let preview = image::open(&path).unwrap();
    assert_eq!(preview.dimensions(), (384, 1));
    let luma = preview.into_luma8();
    assert_eq!(luma.get_pixel(0, 0).0, [0]);
    assert_eq!(luma.get_pixel(3, 0).0, [0]);
    assert_eq!(luma.get_pixel(4, 0).0, [255]);
}

// ── Feeding and interlocks ──────────────────────────────────────────

#[test]
fn feed_moves_paper_and_halts() {
    let mut writer = QueueWriter::new(simulated(256, SimulationConfig::default())).unwrap();

    let status = job::feed_paper(&mut writer, 40).unwrap();

    assert!(!status.has_error());
    let mut coprocessor = writer.into_inner();
    coprocessor.shutdown().unwrap();
    assert_eq!(coprocessor.paper().position(), 40);
    assert_eq!(coprocessor.paper().black_dots(), 0);
    assert_eq!(coprocessor.summary().map(|s| s.batches), Some(1));
}

#[test]
fn paper_out_aborts_the_feed_before_halting() {
    let simulation = SimulationConfig {
        paper_out_after_steps: Some(10),
        ..SimulationConfig::default()
    };
    let mut writer = QueueWriter::new(simulated(256, simulation)).unwrap();

    let status = job::feed_paper(&mut writer, 50).unwrap();

    assert!(status.contains(PrinterStatus::PAPER_OUT));
    assert!(!status.halt_requested());
    let mut coprocessor = writer.into_inner();
    assert_eq!(coprocessor.paper().position(), 10);
    coprocessor.shutdown().unwrap();
    assert!(coprocessor.summary().is_none());
}

#[test]
fn thermal_alarm_stops_the_motor() {
    let simulation = SimulationConfig {
        thermal_trip_after_steps: Some(5),
        ..SimulationConfig::default()
    };
    let mut writer = QueueWriter::new(simulated(256, simulation)).unwrap();

    let status = job::feed_paper(&mut writer, 50).unwrap();

    assert!(status.contains(PrinterStatus::THERMAL_ALARM));
    assert!(!status.contains(PrinterStatus::PAPER_OUT));
    let mut coprocessor = writer.into_inner();
    assert_eq!(coprocessor.paper().position(), 5);
    coprocessor.shutdown().unwrap();
}

// ── Session lifetime ────────────────────────────────────────────────

#[test]
fn halted_session_refuses_further_batches() {
    let mut writer = QueueWriter::new(simulated(256, SimulationConfig::default())).unwrap();
    job::feed_paper(&mut writer, 1).unwrap();

    let err = job::feed_paper(&mut writer, 1).unwrap_err();

    assert!(matches!(err, HostError::CoprocessorStopped(_)));
}

#[test]
fn test_signals_session_is_detached_on_shutdown() {
    let mut writer = QueueWriter::new(simulated(64, SimulationConfig::default())).unwrap();
    job::start_test_signals(&mut writer).unwrap();

    let mut coprocessor = writer.into_inner();
    coprocessor.shutdown().unwrap();

    assert!(coprocessor.summary().is_none());
    assert_eq!(coprocessor.paper().position(), 0);
}
