//! Length-prefixed job item codec.
//!
//! A job item is `{command: u32, length: u32, payload: [u8; length]}`,
//! little-endian, packed back to back in the batch region. The next item
//! starts right after the declared payload.

use crate::command::Command;
pub use crate::geometry::ITEM_HEADER_SIZE;
use thiserror::Error;

/// Failure to decode an item at a given offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ItemError {
    /// The item header does not fit in the region.
    #[error("item header at offset {offset} exceeds region of {capacity} bytes")]
    HeaderOutOfBounds {
        /// Offset of the item.
        offset: usize,
        /// Region size.
        capacity: usize,
    },

    /// The declared payload extends past the end of the region.
    #[error("item at offset {offset} declares {length} payload bytes, region is {capacity} bytes")]
    PayloadOutOfBounds {
        /// Offset of the item.
        offset: usize,
        /// Declared payload length.
        length: u32,
        /// Region size.
        capacity: usize,
    },
}

/// One decoded item, borrowing its payload from the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawItem<'a> {
    /// Raw command word (may be an unknown code).
    pub command: u32,
    /// Declared payload length.
    pub length: u32,
    /// Payload bytes, exactly `length` long.
    pub payload: &'a [u8],
    /// Offset of this item within the region.
    pub offset: usize,
}

impl RawItem<'_> {
    /// Known command, if the code is recognised.
    #[inline]
    pub const fn known_command(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    /// Offset where the following item starts.
    #[inline]
    pub const fn next_offset(&self) -> usize {
        self.offset + ITEM_HEADER_SIZE + self.length as usize
    }
}

/// Serialized size of an item carrying `payload_len` bytes.
#[inline]
pub const fn encoded_len(payload_len: usize) -> usize {
    ITEM_HEADER_SIZE + payload_len
}

/// Write an item at `offset` and return the offset following it.
///
/// # Panics
/// Panics if the item does not fit. Callers reserve space before writing.
pub fn write_item(region: &mut [u8], offset: usize, command: Command, payload: &[u8]) -> usize {
    write_raw_item(region, offset, command.code(), payload)
}

/// Write an item with an arbitrary command word.
///
/// Used to inject malformed items in tests of the interpreter.
pub fn write_raw_item(region: &mut [u8], offset: usize, command: u32, payload: &[u8]) -> usize {
    let end = offset + encoded_len(payload.len());
    let item = &mut region[offset..end];
    item[0..4].copy_from_slice(&command.to_le_bytes());
    item[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    item[ITEM_HEADER_SIZE..].copy_from_slice(payload);
    end
}

/// Decode the item starting at `offset`.
pub fn read_item(region: &[u8], offset: usize) -> Result<RawItem<'_>, ItemError> {
    let capacity = region.len();
    let header_end = offset
        .checked_add(ITEM_HEADER_SIZE)
        .filter(|&end| end <= capacity)
        .ok_or(ItemError::HeaderOutOfBounds { offset, capacity })?;

    let command = read_word(region, offset);
    let length = read_word(region, offset + 4);

    let payload_end = header_end
        .checked_add(length as usize)
        .filter(|&end| end <= capacity)
        .ok_or(ItemError::PayloadOutOfBounds {
            offset,
            length,
            capacity,
        })?;

    Ok(RawItem {
        command,
        length,
        payload: &region[header_end..payload_end],
        offset,
    })
}

#[inline]
fn read_word(region: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&region[offset..offset + 4]);
    u32::from_le_bytes(word)
}
