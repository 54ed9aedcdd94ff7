use super::TagMonitor;
use crate::adv::extract_device_name;
use crate::feedback::Outputs;
use crate::tag::{Link, TagAddress, TagId};

impl<L: Link, O: Outputs, const N: usize> TagMonitor<L, O, N> {
    /// An advertiser was heard. Marks a known tag reachable.
    ///
    /// Returns the tag only when this advertisement changed its state;
    /// unknown addresses and already-reachable tags are no-ops.
    pub fn on_advertisement(&mut self, address: &TagAddress, rssi: i8, data: &[u8]) -> Option<TagId> {
        let id = self.registry.lookup(address)?;
        if !self.registry.tag_mut(id).mark_reachable() {
            return None;
        }
        match extract_device_name(data) {
            Some(name) => info!("found tag {} {} \"{}\" rssi {}", id, address, name.as_str(), rssi),
            None => info!("found tag {} {} rssi {}", id, address, rssi),
        }
        Some(id)
    }
}
