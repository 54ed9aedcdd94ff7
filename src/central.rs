//! Capability interface to the radio stack in Central role.
//!
//! The monitor drives the stack only through this trait; the SoftDevice
//! binding lives in the firmware binary and tests use an in-memory fake.

use crate::config;
use crate::error::Error;
use crate::tag::{Link, NotifyKey, TagAddress, TagId};

/// Scan timing handed to the stack on every (re)start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanWindow {
    pub active: bool,
    pub interval_ms: u16,
    pub window_ms: u16,
    /// 0 = until stopped.
    pub duration_secs: u16,
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self {
            active: config::BLE_SCAN_ACTIVE,
            interval_ms: config::BLE_SCAN_INTERVAL_MS,
            window_ms: config::BLE_SCAN_WINDOW_MS,
            duration_secs: config::BLE_SCAN_DURATION_SECS,
        }
    }
}

/// Whether the button characteristic carried a CCCD (0x2902).
///
/// iTags are not fully compliant and often omit it; the subscription is
/// written regardless and `Missing` is only worth a warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cccd {
    Present,
    Missing,
}

impl Cccd {
    /// Handle the notification enable goes to: the declared descriptor, or
    /// else the one right after the value. `None` if the value sits on the
    /// last handle.
    pub fn write_handle(value_handle: u16, declared: Option<u16>) -> Option<u16> {
        declared.or_else(|| value_handle.checked_add(1))
    }
}

#[allow(async_fn_in_trait)]
pub trait Central {
    type Link: Link;

    /// Open a connection. Blocks until the stack reports success, failure
    /// or its own timeout. Only ever called for a tag that is reachable.
    async fn connect(&mut self, tag: TagId, address: &TagAddress) -> Result<Self::Link, Error>;

    /// Read the Battery Level characteristic (0x180F / 0x2A19).
    ///
    /// `ServiceNotFound` / `CharacteristicNotFound` when the tag lacks them.
    async fn read_battery(&mut self, link: &Self::Link) -> Result<u8, Error>;

    /// Subscribe to button notifications (0xFFE0 / 0xFFE1). Notifications
    /// must be delivered tagged with `key`.
    ///
    /// `NotNotifiable` when the characteristic cannot notify.
    async fn subscribe_button(&mut self, link: &Self::Link, key: NotifyKey) -> Result<Cccd, Error>;

    fn start_scan(&mut self, window: &ScanWindow);

    fn stop_scan(&mut self);

    /// Forget advertisers already reported in this scan.
    fn clear_results(&mut self);
}
