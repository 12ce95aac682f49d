//! Print head geometry and job queue sizing.
//!
//! These constants are the single source of truth for both sides of the
//! shared memory boundary. They are fixed per deployment; there is no
//! runtime reconfiguration of the head.

use static_assertions::const_assert;

/// Number of dots on one physical print line.
pub const DOTS_PER_LINE: usize = 384;

/// Bytes needed to carry one print line (one bit per dot, MSB first).
pub const BYTES_PER_LINE: usize = DOTS_PER_LINE / 8;

/// Maximum number of dots that may be energized in one strobe pass.
///
/// Set by the head's maximum drive current (see head datasheet).
pub const MAX_BLACK_DOTS_PER_LINE: usize = 64;

/// Upper bound for the count carried by a single Motor-Half-Step item.
pub const MAX_HALF_STEPS: u32 = 1000;

/// Size of the coprocessor shared RAM dedicated to the job queue.
pub const SHARED_MEMORY_SIZE: usize = 12 * 1024;

/// Size of the status word at the start of the shared region.
pub const STATUS_SIZE: usize = core::mem::size_of::<u32>();

/// Capacity of the batch region following the status word.
pub const MAX_JOB_SIZE: usize = SHARED_MEMORY_SIZE - STATUS_SIZE;

/// Size of the `{command, length}` header of every job item.
pub const ITEM_HEADER_SIZE: usize = 2 * core::mem::size_of::<u32>();

const_assert!(DOTS_PER_LINE % 8 == 0);
const_assert!(MAX_BLACK_DOTS_PER_LINE <= DOTS_PER_LINE);
// A full print line record must fit an empty batch together with the EOS slot.
const_assert!(ITEM_HEADER_SIZE + BYTES_PER_LINE + ITEM_HEADER_SIZE <= MAX_JOB_SIZE);
const_assert!(MAX_JOB_SIZE % 4 == 0);
