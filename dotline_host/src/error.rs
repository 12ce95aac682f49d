//! Host-level errors.
//!
//! Protocol and interlock faults never show up here: they live in the
//! sticky status register and are reported, not propagated. Everything in
//! [`HostError`] ends the run with a non-zero exit status.

use dotline_common::LayoutError;
use dotline_common::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read image: {0}")]
    Image(#[from] image::ImageError),

    /// PNG signature or header is unreadable.
    #[error("Failed to read PNG header: {0}")]
    PngHeader(#[from] png::DecodingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source image is not 1 bit per pixel.
    #[error("Only monochrome images (1-bit) are allowed! Got {bits} bits per pixel")]
    NotMonochrome { bits: u16 },

    #[error("Invalid row range: {0}")]
    InvalidRowRange(String),

    /// A single item larger than an empty batch can hold.
    #[error("Job item of {size} bytes cannot fit a batch region of {capacity} bytes")]
    ItemTooLarge { size: usize, capacity: usize },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The coprocessor is no longer serving submissions.
    #[error("Coprocessor stopped: {0}")]
    CoprocessorStopped(String),
}

pub type Result<T> = std::result::Result<T, HostError>;
