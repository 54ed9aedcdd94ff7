use heapless::Vec;

use super::TagMonitor;
use crate::central::{Cccd, Central};
use crate::error::Error;
use crate::feedback::Outputs;
use crate::tag::{Link, NotifyKey, TagId};

/// What one reconnection cycle did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport<const N: usize> {
    /// Tags a connect was issued for, in roster order.
    pub attempted: Vec<TagId, N>,
    /// Tags that ended the cycle with an open link.
    pub connected: Vec<TagId, N>,
    /// Tags whose connect attempt failed; they stay reachable.
    pub failed: Vec<TagId, N>,
    /// Open links found dead and reaped before their disconnect event.
    pub reaped: Vec<TagId, N>,
}

impl<L: Link, O: Outputs, const N: usize> TagMonitor<L, O, N> {
    /// One reconnection cycle.
    ///
    /// Connects every reachable tag without an open link, sets the activity
    /// indicator from the number of open links, then carries out a pending
    /// scan restart.
    pub async fn run_cycle<C: Central<Link = L>>(
        &mut self,
        central: &mut C,
        now_ms: u64,
    ) -> CycleReport<N> {
        let mut report = CycleReport::default();

        for id in self.registry.ids() {
            if self.registry.tag(id).has_dead_link() {
                // Same as a disconnect: the tag has to advertise again.
                warn!("link to tag {} dropped without disconnect event", id);
                self.registry.tag_mut(id).close();
                self.restart_scan = true;
                let _ = report.reaped.push(id);
            }

            let tag = self.registry.tag(id);
            if tag.is_open() || !tag.is_reachable() {
                continue;
            }

            let address = *tag.address();
            info!("try connect to tag {}, address {}", id, address);
            let _ = report.attempted.push(id);

            match central.connect(id, &address).await {
                Ok(link) if link.is_connected() => {
                    self.setup_link(id, link, central).await;
                    let _ = report.connected.push(id);
                }
                Ok(_) => {
                    warn!("no connection to tag {}: link not established", id);
                    let _ = report.failed.push(id);
                }
                Err(e) => {
                    warn!("no connection to tag {}: {}", id, e);
                    let _ = report.failed.push(id);
                }
            }
        }

        self.feedback
            .set_indicator(self.registry.connected_count() > 0);

        self.service_scan(central);
        self.next_cycle_ms = now_ms.saturating_add(self.config.reconnect_interval_ms);
        report
    }

    /// Post-connect discovery: battery read and button subscription, both
    /// best-effort. The link is stored whatever they yield.
    async fn setup_link<C: Central<Link = L>>(&mut self, id: TagId, link: L, central: &mut C) {
        let battery = match central.read_battery(&link).await {
            Ok(level) => {
                info!("battery of tag {} is {} percent", id, level);
                Some(level)
            }
            Err(Error::ServiceNotFound) => {
                warn!("failed to find battery service on tag {}", id);
                None
            }
            Err(e) => {
                warn!("battery read on tag {} failed: {}", id, e);
                None
            }
        };

        let key = NotifyKey {
            tag: id,
            epoch: self.registry.tag_mut(id).next_epoch(),
        };
        let notify = match central.subscribe_button(&link, key).await {
            Ok(cccd) => {
                if cccd == Cccd::Missing {
                    warn!("descriptor 0x2902 missing on tag {}, subscribed anyway", id);
                }
                info!("notification callback set for tag {}", id);
                Some(key)
            }
            Err(Error::ServiceNotFound) => {
                warn!("service for button not found on tag {}", id);
                None
            }
            Err(e) => {
                warn!("setting notification callback on tag {} failed: {}", id, e);
                None
            }
        };

        self.registry.tag_mut(id).attach(link, notify, battery);
        if notify.is_some() {
            self.feedback.pulse(self.config.connect_beep_ms);
        }
    }
}
