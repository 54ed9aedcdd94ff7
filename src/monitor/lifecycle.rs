use super::TagMonitor;
use crate::feedback::Outputs;
use crate::tag::{Link, TagAddress, TagId};

impl<L: Link, O: Outputs, const N: usize> TagMonitor<L, O, N> {
    /// The stack reports a link to `address` came up.
    ///
    /// Scanning pauses while the stack connects, so ask for a restart to
    /// keep discovering the other tags.
    pub fn on_connected(&mut self, address: &TagAddress) -> Option<TagId> {
        info!("connected to tag {}", address);
        self.restart_scan = true;
        self.registry.lookup(address)
    }

    /// The stack reports the link to `address` went down.
    ///
    /// The tag becomes unreachable and must advertise again before the next
    /// connect attempt.
    pub fn on_disconnected(&mut self, address: &TagAddress) -> Option<TagId> {
        let Some(id) = self.registry.lookup(address) else {
            warn!("disconnect from unknown peer {}", address);
            return None;
        };
        let tag = self.registry.tag_mut(id);
        if tag.is_open() {
            // Late event from a previous connection; the current one is up.
            debug!("ignoring stale disconnect for tag {}", id);
            return None;
        }
        info!("disconnected from tag {} {}", id, address);
        tag.close();
        self.restart_scan = true;
        Some(id)
    }
}
