use super::TagMonitor;
use crate::feedback::Outputs;
use crate::tag::{Link, NotifyKey, TagId};

impl<L: Link, O: Outputs, const N: usize> TagMonitor<L, O, N> {
    /// A button notification arrived. Returns the tag when it counts as a
    /// new press.
    pub fn on_notification(&mut self, key: NotifyKey, now_ms: u64) -> Option<TagId> {
        let Some(id) = self.registry.owner_of(key) else {
            debug!("notification for stale subscription {}", key.tag);
            return None;
        };
        if !self
            .registry
            .tag_mut(id)
            .accept_press(now_ms, self.config.press_debounce_ms)
        {
            return None;
        }
        info!("button pressed on tag {}", id);
        self.feedback.pulse(self.config.press_beep_ms);
        Some(id)
    }
}
