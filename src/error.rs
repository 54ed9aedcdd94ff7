//! Unified error type for itag-finder.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging and `Display` for host builds.

use core::fmt;

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The radio stack returned a BLE-level error.
    Ble(BleError),

    /// The peripheral does not expose the requested GATT service.
    ServiceNotFound,

    /// The service exists but the requested characteristic is absent.
    CharacteristicNotFound,

    /// The button characteristic does not support notifications.
    NotNotifiable,

    /// The link dropped before the operation could complete.
    NotConnected,

    // Configuration
    /// A textual hardware address could not be parsed.
    InvalidAddress,

    /// The same address appears twice in the tag roster.
    DuplicateTag,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// GAP / GATT raw error code from the SoftDevice.
    Raw(u32),
    /// Connection attempt failed or timed out.
    ConnectFailed,
    /// GATT discovery failed.
    DiscoveryFailed,
    /// Characteristic read failed.
    ReadFailed,
    /// Characteristic subscribe/notify failed.
    NotifyFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Ble(e) => write!(f, "BLE error: {}", e),
            Error::ServiceNotFound => f.write_str("service not found"),
            Error::CharacteristicNotFound => f.write_str("characteristic not found"),
            Error::NotNotifiable => f.write_str("characteristic cannot notify"),
            Error::NotConnected => f.write_str("not connected"),
            Error::InvalidAddress => f.write_str("invalid hardware address"),
            Error::DuplicateTag => f.write_str("duplicate tag address in roster"),
        }
    }
}

impl fmt::Display for BleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BleError::Raw(code) => write!(f, "raw code {:#x}", code),
            BleError::ConnectFailed => f.write_str("connect failed"),
            BleError::DiscoveryFailed => f.write_str("discovery failed"),
            BleError::ReadFailed => f.write_str("read failed"),
            BleError::NotifyFailed => f.write_str("notify failed"),
        }
    }
}
