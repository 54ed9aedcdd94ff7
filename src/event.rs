//! Inbound events for the tag monitor.
//!
//! Every radio-stack callback is turned into one of these and delivered to a
//! single loop, together with the periodic tick, so all decisions about tag
//! state are taken in one place and in order.

use heapless::Vec;

use crate::adv::AdvData;
use crate::tag::{NotifyKey, TagAddress};

/// Largest notification payload we keep (default ATT MTU minus header).
pub const MAX_NOTIFY_LEN: usize = 20;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TagEvent {
    /// An advertiser was heard during a scan.
    Advertisement {
        address: TagAddress,
        rssi: i8,
        data: AdvData,
    },
    /// A low-level connection to `address` came up.
    Connected(TagAddress),
    /// The connection to `address` went down.
    Disconnected(TagAddress),
    /// A subscribed button characteristic changed. The payload is opaque.
    Notification {
        key: NotifyKey,
        payload: Vec<u8, MAX_NOTIFY_LEN>,
    },
    /// Coarse periodic tick from the main loop.
    Tick,
}
