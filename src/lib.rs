//! Tag presence and connection state machine for iTag beacon buttons.
//!
//! Everything here is hardware independent and runs on the host:
//!
//! - [`registry`] - the fixed roster of known tags and their state.
//! - [`monitor`] - advertisement observer, connection lifecycle handler,
//!   button debounce and the periodic reconnection scheduler.
//! - [`central`] / [`feedback`] - the seams to the radio stack and to the
//!   LED/buzzer, implemented by the firmware binary.
//!
//! Usage: `cargo test --lib` / `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and is only built with `--features embedded`.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod adv;
pub mod central;
pub mod config;
pub mod error;
pub mod event;
pub mod feedback;
pub mod monitor;
pub mod registry;
pub mod tag;

pub use central::{Cccd, Central, ScanWindow};
pub use error::{BleError, Error};
pub use event::TagEvent;
pub use feedback::{Feedback, Outputs};
pub use monitor::{CycleReport, MonitorConfig, TagMonitor};
pub use registry::TagRegistry;
pub use tag::{Link, NotifyKey, Tag, TagAddress, TagId, TagState};
