//! A single known iTag and its runtime state.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Stable 48-bit hardware address of a tag, most significant byte first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TagAddress([u8; 6]);

impl TagAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Address octets, most significant first.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Address octets in over-the-air (little-endian) order.
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// Build from over-the-air (little-endian) octets.
    pub fn from_le_bytes(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Random static addresses carry `0b11` in the two top bits.
    pub fn is_random_static(&self) -> bool {
        self.0[0] & 0xc0 == 0xc0
    }

    /// Parse the usual `ff:ff:11:11:a2:fa` notation (either case).
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(Error::InvalidAddress)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::InvalidAddress);
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| Error::InvalidAddress)?;
        }
        if parts.next().is_some() {
            return Err(Error::InvalidAddress);
        }
        Ok(Self(octets))
    }
}

impl FromStr for TagAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TagAddress {
    fn format(&self, f: defmt::Formatter) {
        let [a, b, c, d, e, g] = self.0;
        defmt::write!(
            f,
            "{=u8:02x}:{=u8:02x}:{=u8:02x}:{=u8:02x}:{=u8:02x}:{=u8:02x}",
            a,
            b,
            c,
            d,
            e,
            g
        )
    }
}

/// Position of a tag in the registry. Stable for the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TagId(pub(crate) usize);

impl TagId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Correlation key carried with a button subscription.
///
/// `epoch` is the connection generation of the owning tag, so a notification
/// queued by an earlier connection never matches the current one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NotifyKey {
    pub tag: TagId,
    pub epoch: u16,
}

/// Open connection resource as seen by the core.
pub trait Link {
    fn is_connected(&self) -> bool;
}

/// Presence state derived from a tag's fields.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TagState {
    /// Not heard since the last disconnect.
    Unreachable,
    /// Advertising, eligible for a connect attempt.
    Reachable,
    /// Link open.
    Connected,
}

/// One known physical tag.
pub struct Tag<L> {
    address: TagAddress,
    link: Option<L>,
    notify: Option<NotifyKey>,
    reachable: bool,
    last_press_ms: Option<u64>,
    epoch: u16,
    battery: Option<u8>,
}

impl<L: Link> Tag<L> {
    pub fn new(address: TagAddress) -> Self {
        Self {
            address,
            link: None,
            notify: None,
            reachable: false,
            last_press_ms: None,
            epoch: 0,
            battery: None,
        }
    }

    pub fn address(&self) -> &TagAddress {
        &self.address
    }

    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    pub fn notify_key(&self) -> Option<NotifyKey> {
        self.notify
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Last battery percentage read after a connect.
    pub fn battery(&self) -> Option<u8> {
        self.battery
    }

    pub fn last_press_ms(&self) -> Option<u64> {
        self.last_press_ms
    }

    /// A link is stored and the stack still reports it connected.
    pub fn is_open(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.is_connected())
    }

    /// A link is stored but the stack no longer reports it connected.
    pub fn has_dead_link(&self) -> bool {
        self.link.as_ref().is_some_and(|l| !l.is_connected())
    }

    pub fn state(&self) -> TagState {
        if self.is_open() {
            TagState::Connected
        } else if self.reachable {
            TagState::Reachable
        } else {
            TagState::Unreachable
        }
    }

    /// Returns `true` if the flag changed.
    pub(crate) fn mark_reachable(&mut self) -> bool {
        let changed = !self.reachable;
        self.reachable = true;
        changed
    }

    /// Drop the link and everything tied to it; the tag must advertise
    /// again before it is eligible for another connect.
    pub(crate) fn close(&mut self) {
        self.link = None;
        self.notify = None;
        self.reachable = false;
    }

    /// Start a new connection generation and return its epoch.
    pub(crate) fn next_epoch(&mut self) -> u16 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub(crate) fn attach(&mut self, link: L, notify: Option<NotifyKey>, battery: Option<u8>) {
        self.link = Some(link);
        self.notify = notify;
        if battery.is_some() {
            self.battery = battery;
        }
    }

    /// Debounce: accept a press unless the previous accepted one is
    /// younger than `debounce_ms`.
    pub(crate) fn accept_press(&mut self, now_ms: u64, debounce_ms: u64) -> bool {
        match self.last_press_ms {
            Some(last) if now_ms.saturating_sub(last) < debounce_ms => false,
            _ => {
                self.last_press_ms = Some(now_ms);
                true
            }
        }
    }
}
