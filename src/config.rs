//! Application-wide constants and compile-time configuration.
//!
//! The tag roster, timing parameters, GATT identifiers and output pin
//! settings live here so they can be tuned in one place.

use crate::tag::TagAddress;

// Tag roster

/// Number of known iTags.
pub const MAX_TAGS: usize = 3;

/// Hardware addresses of the known iTags, most significant byte first
/// (the order they are printed in, e.g. `ff:ff:11:11:a2:fa`).
pub const KNOWN_TAGS: [TagAddress; MAX_TAGS] = [
    TagAddress::new([0xff, 0xff, 0x11, 0x11, 0xa2, 0xfa]),
    TagAddress::new([0xff, 0xff, 0x22, 0x21, 0xab, 0x11]),
    TagAddress::new([0xff, 0xff, 0x77, 0x70, 0x4b, 0xf0]),
];

// Timing

/// Cadence of the main loop tick (ms). Drives both the reconnection
/// scheduler and the buzzer countdown.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Time between two reconnection cycles (ms).
pub const RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Notifications closer together than this are the same physical press.
pub const PRESS_DEBOUNCE_MS: u64 = 500;

/// Buzzer pulse for an accepted button press (ms).
pub const PRESS_BEEP_MS: u32 = 500;

/// Buzzer pulse after a tag has been connected and subscribed (ms).
pub const CONNECT_BEEP_MS: u32 = 1_000;

// BLE scanning

/// Active scanning requests scan responses, which makes tags show up faster.
pub const BLE_SCAN_ACTIVE: bool = true;

/// Scan interval (ms).
pub const BLE_SCAN_INTERVAL_MS: u16 = 45;

/// Scan window (ms).
pub const BLE_SCAN_WINDOW_MS: u16 = 15;

/// Scan duration in seconds, 0 = scan until stopped.
pub const BLE_SCAN_DURATION_SECS: u16 = 0;

/// Stop scanning as soon as every known tag has been heard.
pub const BLE_SCAN_STOP_WHEN_ALL_FOUND: bool = false;

// BLE connections

/// Connect attempt timeout (in 10 ms units). 500 = 5 s.
pub const BLE_CONNECT_TIMEOUT: u16 = 500;

/// BLE connection interval range (in 1.25 ms units).
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// GATT identifiers

/// Battery Service.
pub const BATTERY_SERVICE_UUID: u16 = 0x180f;
/// Battery Level characteristic.
pub const BATTERY_LEVEL_UUID: u16 = 0x2a19;
/// iTag button service.
pub const BUTTON_SERVICE_UUID: u16 = 0xffe0;
/// iTag button characteristic (notifies on every press).
pub const BUTTON_CHAR_UUID: u16 = 0xffe1;
/// Client Characteristic Configuration Descriptor.
pub const CCCD_UUID: u16 = 0x2902;

// Feedback outputs (nRF52840-DK defaults)
//
//   Activity LED  → P0.13 (LED1, active-low)
//   Buzzer        → P0.28 (PWM0 channel 0)

/// The DK LEDs light when the pin is driven low.
pub const LED_ACTIVE_LOW: bool = true;

/// Buzzer tone frequency (Hz).
pub const BUZZER_FREQUENCY_HZ: u32 = 2_000;

/// Buzzer duty while sounding, in 1/256 of the period.
pub const BUZZER_DUTY_256: u16 = 10;
