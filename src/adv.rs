//! Advertisement data (AD structure) helpers.

use heapless::{String, Vec};

use crate::tag::TagAddress;

/// Raw advertisement payload as delivered by the scanner (legacy PDU size).
pub type AdvData = Vec<u8, 31>;

/// Walk the AD structures and return the first one of `ad_type`.
fn find_ad(data: &[u8], ad_type: u8) -> Option<&[u8]> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        if data[i + 1] == ad_type {
            return Some(&data[i + 2..i + 1 + len]);
        }
        i += len + 1;
    }
    None
}

/// Extract complete (0x09) or shortened (0x08) local name, truncated to
/// 32 bytes.
pub fn extract_device_name(data: &[u8]) -> Option<String<32>> {
    let bytes = find_ad(data, 0x09).or_else(|| find_ad(data, 0x08))?;
    let mut name = String::new();
    for &b in bytes {
        if name.push(b as char).is_err() {
            break;
        }
    }
    Some(name)
}

/// Which scan reports get forwarded to the monitor.
///
/// Only roster addresses pass, each at most once until [`clear`](Self::clear).
/// Other advertisers never take a slot, so the list cannot fill up however
/// crowded the air is.
pub struct ReportFilter<const N: usize> {
    roster: [TagAddress; N],
    reported: Vec<TagAddress, N>,
}

impl<const N: usize> ReportFilter<N> {
    pub const fn new(roster: [TagAddress; N]) -> Self {
        Self {
            roster,
            reported: Vec::new(),
        }
    }

    /// `address` is on the roster and not reported yet in this scan.
    pub fn wants(&self, address: &TagAddress) -> bool {
        self.roster.contains(address) && !self.reported.contains(address)
    }

    /// Record that `address` was handed on.
    pub fn mark_reported(&mut self, address: TagAddress) {
        if self.wants(&address) {
            // Distinct roster entries never exceed N.
            let _ = self.reported.push(address);
        }
    }

    /// Make every roster tag eligible again.
    pub fn clear(&mut self) {
        self.reported.clear();
    }
}
