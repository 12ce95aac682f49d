//! Monochrome bitmap source.
//!
//! Only 1-bit-per-pixel PNGs are accepted, grayscale or palette. The depth
//! is taken from the PNG header; the pixels are then expanded to 8-bit luma
//! and repacked MSB-first with a set bit for every light pixel (sample 1 in
//! a grayscale PNG). The encoder's invert flag decides which of the two
//! gets burned.

use std::io::Cursor;
use std::path::Path;

use crate::error::HostError;
use image::{GrayImage, ImageFormat};
use tracing::debug;

/// Row-major, bit-packed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// Load a 1-bit PNG file.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let bitmap = Self::from_png_bytes(&std::fs::read(path)?)?;
        debug!(
            path = %path.display(),
            width = bitmap.width,
            height = bitmap.height,
            "Loaded monochrome image"
        );
        Ok(bitmap)
    }

    /// Decode a 1-bit PNG held in memory.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, HostError> {
        let header = png::Decoder::new(Cursor::new(bytes)).read_info()?;
        let info = header.info();
        if info.bit_depth != png::BitDepth::One {
            let bits = info.bit_depth as u16 * info.color_type.samples() as u16;
            return Err(HostError::NotMonochrome { bits });
        }
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_luma8();
        Ok(Self::from_luma(&image))
    }

    /// Threshold an 8-bit grayscale image at mid-gray.
    pub fn from_luma(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let mut bitmap = Self::blank(width, height);
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[0] >= 128 {
                bitmap.data[y as usize * bitmap.stride + x as usize / 8] |= 0x80 >> (x % 8);
            }
        }
        bitmap
    }

    /// Wrap already packed rows. Short data is zero-padded, extra dropped.
    pub fn from_packed(width: u32, height: u32, mut data: Vec<u8>) -> Self {
        let stride = stride_for(width);
        data.resize(stride * height as usize, 0);
        Self {
            width,
            height,
            stride,
            data,
        }
    }

    fn blank(width: u32, height: u32) -> Self {
        Self::from_packed(width, height, Vec::new())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Packed bits of row `y`.
    ///
    /// # Panics
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.stride]
    }
}

fn stride_for(width: u32) -> usize {
    (width as usize).div_ceil(8)
}
