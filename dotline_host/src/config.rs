//! Host configuration.
//!
//! ```toml
//! [shared]
//! service_name = "dotline"
//!
//! [printer]
//! max_black_dots = 64
//! queue_size = 12284
//!
//! [simulation]
//! pacing = false
//! thermal_trip_after_steps = 500
//! ```
//!
//! Every table is optional; missing values fall back to the head limits.

use dotline_common::config::{ConfigError, SharedConfig};
use dotline_common::geometry::{
    BYTES_PER_LINE, ITEM_HEADER_SIZE, MAX_BLACK_DOTS_PER_LINE, MAX_JOB_SIZE, STATUS_SIZE,
};
use dotline_common::item::encoded_len;
use serde::{Deserialize, Serialize};
use tracing::{Span, info_span};

/// Smallest batch region that holds one Print-Line item and the EOS slot.
pub const MIN_QUEUE_SIZE: usize = encoded_len(BYTES_PER_LINE) + ITEM_HEADER_SIZE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl HostConfig {
    /// # Errors
    ///
    /// `ConfigError::ValidationError` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.printer.validate()
    }

    /// Span tagging log output with this instance's `service_name`.
    pub fn service_span(&self) -> Span {
        info_span!("service", name = %self.shared.service_name)
    }
}

/// Encoder limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Black dots per Print-Line pass.
    pub max_black_dots: usize,
    /// Batch region size in bytes, excluding the status word.
    pub queue_size: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            max_black_dots: MAX_BLACK_DOTS_PER_LINE,
            queue_size: MAX_JOB_SIZE,
        }
    }
}

impl PrinterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BLACK_DOTS_PER_LINE).contains(&self.max_black_dots) {
            return Err(ConfigError::ValidationError(format!(
                "printer.max_black_dots must be between 1 and {MAX_BLACK_DOTS_PER_LINE}, got {}",
                self.max_black_dots
            )));
        }
        if !(MIN_QUEUE_SIZE..=MAX_JOB_SIZE).contains(&self.queue_size) {
            return Err(ConfigError::ValidationError(format!(
                "printer.queue_size must be between {MIN_QUEUE_SIZE} and {MAX_JOB_SIZE}, got {}",
                self.queue_size
            )));
        }
        Ok(())
    }

    /// Shared block size: status word plus batch region.
    pub fn memory_size(&self) -> usize {
        STATUS_SIZE + self.queue_size
    }
}

/// Simulated coprocessor behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Sleep in real time for every simulated delay.
    pub pacing: bool,
    /// Motor driver overheats once this many half-steps have run.
    pub thermal_trip_after_steps: Option<u64>,
    /// Paper runs out once this many half-steps have run.
    pub paper_out_after_steps: Option<u64>,
}
