//! dotline Common Library
//!
//! Shared data model for the host encoder and the real-time coprocessor
//! that drives the thermal print head. Both sides see the same shared
//! memory region, so the layout, command codes and status bits live here
//! and nowhere else.
//!
//! # Module Structure
//!
//! - [`geometry`] - Fixed head geometry and queue sizing constants
//! - [`command`] - Job item command codes
//! - [`status`] - Sticky printer status register flags
//! - [`item`] - Length-prefixed job item codec
//! - [`queue`] - Shared job queue view (`[status][batch region]`)
//! - [`config`] - TOML configuration loading (requires `std`)
//!
//! The crate is `no_std` when built without the default `std` feature so
//! that the firmware crate can share it.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod command;
#[cfg(feature = "std")]
pub mod config;
pub mod geometry;
pub mod item;
pub mod queue;
pub mod status;

pub use command::Command;
pub use item::{ItemError, RawItem};
pub use queue::{LayoutError, QueueView, StatusRegister};
pub use status::PrinterStatus;
