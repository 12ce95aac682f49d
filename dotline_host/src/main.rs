//! # dotline
//!
//! Prints 1-bit PNG images on the dotline thermal printer, feeds paper, or
//! starts the diagnostic output pattern.
//!
//! # Usage
//!
//! ```bash
//! # Print rows 10..=200 of an image, inverted, then feed 40 half-steps
//! dotline -s 10 -e 200 -i -f 40 receipt.png
//!
//! # Feed paper only
//! dotline -f 200
//!
//! # Output test pattern (no head attached!)
//! dotline -t -w
//!
//! # Simulate a paper-out after 100 half-steps and keep the printout
//! dotline --paper-out-after 100 --preview out.png receipt.png
//! ```

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use dotline_common::PrinterStatus;
use dotline_common::config::{ConfigLoader, LogLevel};
use dotline_firmware::ProcessorConfig;
use dotline_host::job::{self, PrintOptions, RowRange};
use dotline_host::{
    Coprocessor, HostConfig, LinePartitioner, MonoBitmap, QueueWriter, SimulatedCoprocessor,
    StatusReport,
};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// dotline - thermal print head driver
#[derive(Parser, Debug)]
#[command(name = "dotline")]
#[command(version)]
#[command(about = "Print 1-bit PNG images on the dotline thermal printer")]
#[command(long_about = None)]
struct Args {
    /// 1-bit PNG image to print
    file: Option<PathBuf>,

    /// First image row to print
    #[arg(short, long, value_name = "START")]
    start: Option<u32>,

    /// Last image row to print
    #[arg(short, long, value_name = "END")]
    end: Option<u32>,

    /// Invert image while printing
    #[arg(short, long)]
    invert: bool,

    /// Feed printer paper by COUNT half-steps (after the image, if one is given)
    #[arg(short, long, value_name = "COUNT")]
    feed: Option<u32>,

    /// Test pattern signal generation. CAUTION: use only with no printer hardware connected!
    #[arg(short, long)]
    test: bool,

    /// Wait for ENTER before stopping the coprocessor
    #[arg(short, long)]
    wait: bool,

    /// Path to dotline.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the simulated printout as a PNG
    #[arg(long, value_name = "PATH")]
    preview: Option<PathBuf>,

    /// Simulate a motor driver thermal alarm after N half-steps
    #[arg(long, value_name = "N")]
    thermal_trip_after: Option<u64>,

    /// Simulate running out of paper after N half-steps
    #[arg(long, value_name = "N")]
    paper_out_after: Option<u64>,

    /// Run the simulated coprocessor in real time
    #[arg(long)]
    pacing: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// Job ready to queue.
enum Job {
    Test,
    Feed(u32),
    Print(MonoBitmap, PrintOptions),
}

/// What this run does, in precedence order.
enum Mode {
    Test,
    Feed(u32),
    Print(PathBuf),
}

impl Mode {
    fn from_args(args: &Args) -> Option<Self> {
        if args.test {
            return Some(Self::Test);
        }
        match (&args.file, args.feed) {
            (None, Some(count)) => Some(Self::Feed(count)),
            (Some(file), _) => Some(Self::Print(file.clone())),
            (None, None) => None,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("FATAL: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args);
    let log_level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);
    let mut config = config?;
    let _service = config.service_span().entered();

    info!(
        service = %config.shared.service_name,
        "dotline v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let Some(mode) = Mode::from_args(&args) else {
        Args::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "nothing to do: give an image FILE, -f COUNT or -t",
            )
            .exit();
    };

    if let Some(steps) = args.thermal_trip_after {
        config.simulation.thermal_trip_after_steps = Some(steps);
    }
    if let Some(steps) = args.paper_out_after {
        config.simulation.paper_out_after_steps = Some(steps);
    }
    // The test pattern only makes sense observed in real time.
    config.simulation.pacing |= args.pacing || matches!(mode, Mode::Test);

    // Fatal input errors surface before anything is queued.
    let work = match mode {
        Mode::Test => Job::Test,
        Mode::Feed(count) => Job::Feed(count),
        Mode::Print(path) => {
            info!("Loading image {}", path.display());
            let bitmap = MonoBitmap::load(&path)?;
            info!(width = bitmap.width(), height = bitmap.height(), "Image loaded successfully");
            let rows = RowRange::resolve(args.start, args.end, bitmap.height())?;
            let options = PrintOptions {
                rows,
                invert: args.invert,
                feed_after: args.feed.unwrap_or(0),
            };
            Job::Print(bitmap, options)
        }
    };

    info!("Initializing coprocessor");
    let coprocessor = SimulatedCoprocessor::spawn(
        config.printer.memory_size(),
        ProcessorConfig::default(),
        &config.simulation,
    )?;
    let mut writer = QueueWriter::new(coprocessor)?;

    match work {
        Job::Test => job::start_test_signals(&mut writer)?,
        Job::Feed(count) => {
            let status = job::feed_paper(&mut writer, count)?;
            report(status);
        }
        Job::Print(bitmap, options) => {
            let partitioner = LinePartitioner::new(config.printer.max_black_dots);
            let summary = job::print_image(&mut writer, &partitioner, &bitmap, &options)?;
            info!(
                rows = summary.rows,
                passes = summary.passes,
                batches = summary.batches,
                "Print job finished"
            );
            report(summary.status);
        }
    }

    if args.wait {
        println!("Press ENTER to disable the coprocessor and end the program...");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
    }

    info!("Disabling coprocessor");
    let mut coprocessor = writer.into_inner();
    coprocessor.shutdown()?;

    if let Some(path) = &args.preview {
        let paper = coprocessor.paper();
        paper.save_png(path)?;
        info!(
            rows = paper.position(),
            black_dots = paper.black_dots(),
            "Wrote preview to {}",
            path.display()
        );
    }

    info!("dotline shutdown complete");
    Ok(())
}

fn load_config(args: &Args) -> Result<HostConfig, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Log the final status the way the user reads it.
fn report(status: PrinterStatus) {
    let report = StatusReport::new(status);
    if report.is_success() {
        info!("{report}");
    } else {
        for line in report.to_string().lines() {
            warn!("{line}");
        }
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        log_level.as_directive().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
