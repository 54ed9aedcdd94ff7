//! Tag presence and connection state machine.
//!
//! `TagMonitor` owns the registry and the feedback outputs and is the only
//! thing that mutates them. Radio callbacks arrive as [`TagEvent`]s and are
//! applied one at a time by [`TagMonitor::handle`]:
//!
//! ```text
//! Unreachable --advertisement--> Reachable --connect ok--> Connected
//!      ^                           |   ^                      |
//!      |                           +---+ connect failed       |
//!      +------------------------disconnect--------------------+
//! ```
//!
//! A connect is only ever issued for a reachable tag; connecting to an
//! address that is not on air can block the stack indefinitely.

mod button;
mod lifecycle;
mod observer;
mod scheduler;

#[cfg(test)]
mod tests;

pub use scheduler::CycleReport;

use crate::central::{Central, ScanWindow};
use crate::config;
use crate::event::TagEvent;
use crate::feedback::{Feedback, Outputs};
use crate::registry::TagRegistry;
use crate::tag::Link;

/// Runtime-tunable subset of the configuration.
#[derive(Clone, Copy, Debug)]
pub struct MonitorConfig {
    pub reconnect_interval_ms: u64,
    pub press_debounce_ms: u64,
    pub press_beep_ms: u32,
    pub connect_beep_ms: u32,
    /// Buzzer time credited per `Tick`, whatever the wall clock says.
    pub tick_ms: u32,
    /// Stop scanning once every tag has been heard.
    pub stop_scan_when_all_found: bool,
    pub scan: ScanWindow,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: config::RECONNECT_INTERVAL_MS,
            press_debounce_ms: config::PRESS_DEBOUNCE_MS,
            press_beep_ms: config::PRESS_BEEP_MS,
            connect_beep_ms: config::CONNECT_BEEP_MS,
            tick_ms: config::POLL_INTERVAL_MS as u32,
            stop_scan_when_all_found: config::BLE_SCAN_STOP_WHEN_ALL_FOUND,
            scan: ScanWindow::default(),
        }
    }
}

pub struct TagMonitor<L, O, const N: usize> {
    registry: TagRegistry<L, N>,
    feedback: Feedback<O>,
    config: MonitorConfig,
    restart_scan: bool,
    next_cycle_ms: u64,
}

impl<L: Link, O: Outputs, const N: usize> TagMonitor<L, O, N> {
    pub fn new(registry: TagRegistry<L, N>, outputs: O, config: MonitorConfig) -> Self {
        Self {
            registry,
            feedback: Feedback::new(outputs),
            config,
            restart_scan: false,
            next_cycle_ms: 0,
        }
    }

    pub fn registry(&self) -> &TagRegistry<L, N> {
        &self.registry
    }

    pub fn feedback(&self) -> &Feedback<O> {
        &self.feedback
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// A scan restart has been requested and not yet carried out.
    pub fn scan_restart_pending(&self) -> bool {
        self.restart_scan
    }

    /// Begin discovery. Call once before feeding events.
    pub fn start<C: Central<Link = L>>(&mut self, central: &mut C) {
        info!("starting scan for {} tags", N);
        central.start_scan(&self.config.scan);
    }

    /// Apply one event. `now_ms` is a monotonic millisecond clock.
    pub async fn handle<C: Central<Link = L>>(
        &mut self,
        event: TagEvent,
        central: &mut C,
        now_ms: u64,
    ) {
        match event {
            TagEvent::Advertisement {
                address,
                rssi,
                data,
            } => {
                if self.on_advertisement(&address, rssi, &data).is_some()
                    && self.config.stop_scan_when_all_found
                    && self.registry.all_reachable()
                {
                    info!("all tags found, stopping scan");
                    central.stop_scan();
                }
            }
            TagEvent::Connected(address) => {
                self.on_connected(&address);
            }
            TagEvent::Disconnected(address) => {
                self.on_disconnected(&address);
            }
            TagEvent::Notification { key, .. } => {
                self.on_notification(key, now_ms);
            }
            TagEvent::Tick => {
                self.poll(central, now_ms).await;
            }
        }
    }

    /// Periodic step: advance the buzzer countdown, run a reconnection cycle
    /// when one is due, and carry out a pending scan restart.
    pub async fn poll<C: Central<Link = L>>(&mut self, central: &mut C, now_ms: u64) {
        // One tick is `tick_ms` of buzzer time, however long the last cycle
        // blocked.
        self.feedback.tick(self.config.tick_ms);

        if now_ms >= self.next_cycle_ms {
            self.run_cycle(central, now_ms).await;
        } else {
            self.service_scan(central);
        }
    }

    /// Restart the scan if the lifecycle handler asked for it. With early
    /// stop enabled and every tag already heard, the scan is left off.
    fn service_scan<C: Central<Link = L>>(&mut self, central: &mut C) {
        if !self.restart_scan {
            return;
        }
        self.restart_scan = false;
        debug!("restarting scan");
        central.stop_scan();
        central.clear_results();
        if self.config.stop_scan_when_all_found && self.registry.all_reachable() {
            info!("all tags found, scan stays off");
            return;
        }
        central.start_scan(&self.config.scan);
    }
}
