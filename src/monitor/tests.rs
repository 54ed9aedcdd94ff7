use std::cell::Cell;
use std::rc::Rc;
use std::vec::Vec;

use embassy_futures::block_on;

use super::*;
use crate::adv::AdvData;
use crate::central::Cccd;
use crate::error::{BleError, Error};
use crate::tag::{NotifyKey, TagAddress, TagId, TagState};

const A: TagAddress = TagAddress::new([0xff, 0xff, 0x11, 0x11, 0xa2, 0xfa]);
const B: TagAddress = TagAddress::new([0xff, 0xff, 0x22, 0x21, 0xab, 0x11]);
const STRANGER: TagAddress = TagAddress::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

#[derive(Clone)]
struct TestLink(Rc<Cell<bool>>);

impl Link for TestLink {
    fn is_connected(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, PartialEq)]
enum Op {
    Start,
    Stop,
    Clear,
    Connect(TagAddress),
}

/// Every connect succeeds; battery and button answers are configurable.
struct TestCentral {
    ops: Vec<Op>,
    links: Vec<(TagAddress, Rc<Cell<bool>>)>,
    battery: Result<u8, Error>,
    button: Result<Cccd, Error>,
    refuse: bool,
}

impl TestCentral {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            links: Vec::new(),
            battery: Ok(90),
            button: Ok(Cccd::Present),
            refuse: false,
        }
    }

    fn drop_link(&self, address: TagAddress) {
        for (a, alive) in &self.links {
            if *a == address {
                alive.set(false);
            }
        }
    }

    fn connects(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Connect(_)))
            .count()
    }
}

impl Central for TestCentral {
    type Link = TestLink;

    async fn connect(&mut self, _tag: TagId, address: &TagAddress) -> Result<TestLink, Error> {
        self.ops.push(Op::Connect(*address));
        if self.refuse {
            return Err(BleError::ConnectFailed.into());
        }
        let alive = Rc::new(Cell::new(true));
        self.links.push((*address, alive.clone()));
        Ok(TestLink(alive))
    }

    async fn read_battery(&mut self, _link: &TestLink) -> Result<u8, Error> {
        self.battery
    }

    async fn subscribe_button(&mut self, _link: &TestLink, _key: NotifyKey) -> Result<Cccd, Error> {
        self.button
    }

    fn start_scan(&mut self, _window: &ScanWindow) {
        self.ops.push(Op::Start);
    }

    fn stop_scan(&mut self) {
        self.ops.push(Op::Stop);
    }

    fn clear_results(&mut self) {
        self.ops.push(Op::Clear);
    }
}

#[derive(Default)]
struct Pins {
    indicator: bool,
    buzzer: bool,
}

impl Outputs for Pins {
    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
    }

    fn set_buzzer(&mut self, on: bool) {
        self.buzzer = on;
    }
}

type Monitor = TagMonitor<TestLink, Pins, 2>;

fn monitor() -> Monitor {
    monitor_with(MonitorConfig::default())
}

fn monitor_with(config: MonitorConfig) -> Monitor {
    TagMonitor::new(TagRegistry::new([A, B]).unwrap(), Pins::default(), config)
}

fn advertise(address: TagAddress) -> TagEvent {
    TagEvent::Advertisement {
        address,
        rssi: -60,
        data: AdvData::new(),
    }
}

/// Advertise `address` and run one cycle so it ends up connected.
fn connect(m: &mut Monitor, central: &mut TestCentral, address: TagAddress, now_ms: u64) {
    block_on(m.handle(advertise(address), central, now_ms));
    block_on(m.run_cycle(central, now_ms));
}

#[test]
fn start_begins_scanning() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    m.start(&mut central);
    assert_eq!(central.ops, [Op::Start]);
}

#[test]
fn advertisement_marks_known_tag_reachable_once() {
    let mut m = monitor();
    assert_eq!(m.on_advertisement(&A, -50, &[]), Some(TagId(0)));
    assert_eq!(m.on_advertisement(&A, -50, &[]), None);
    assert_eq!(m.registry().tag(TagId(0)).state(), TagState::Reachable);
    assert_eq!(m.registry().tag(TagId(1)).state(), TagState::Unreachable);
}

#[test]
fn unknown_advertiser_is_ignored() {
    let mut m = monitor();
    assert_eq!(m.on_advertisement(&STRANGER, -50, &[]), None);
    assert!(m.registry().iter().all(|(_, t)| !t.is_reachable()));
}

#[test]
fn advertisement_has_no_effect_on_connection_state() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    block_on(m.handle(advertise(A), &mut central, 0));
    assert!(central.ops.is_empty());
    assert!(m.registry().tag(TagId(0)).link().is_none());
    assert!(!m.scan_restart_pending());
}

#[test]
fn connected_event_requests_scan_restart() {
    let mut m = monitor();
    assert_eq!(m.on_connected(&A), Some(TagId(0)));
    assert!(m.scan_restart_pending());
}

#[test]
fn disconnect_clears_reachability_and_subscription() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    assert!(m.registry().tag(TagId(0)).notify_key().is_some());

    central.drop_link(A);
    assert_eq!(m.on_disconnected(&A), Some(TagId(0)));

    let tag = m.registry().tag(TagId(0));
    assert_eq!(tag.state(), TagState::Unreachable);
    assert!(tag.link().is_none());
    assert!(tag.notify_key().is_none());
    assert!(m.scan_restart_pending());
}

#[test]
fn disconnect_from_unknown_peer_is_ignored() {
    let mut m = monitor();
    m.on_advertisement(&A, -50, &[]);
    assert_eq!(m.on_disconnected(&STRANGER), None);
    assert!(!m.scan_restart_pending());
    assert!(m.registry().tag(TagId(0)).is_reachable());
}

#[test]
fn late_disconnect_does_not_tear_down_live_link() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    assert_eq!(m.on_disconnected(&A), None);
    assert_eq!(m.registry().tag(TagId(0)).state(), TagState::Connected);
}

#[test]
fn press_is_debounced_per_tag() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    connect(&mut m, &mut central, B, 0);
    let ka = m.registry().tag(TagId(0)).notify_key().unwrap();
    let kb = m.registry().tag(TagId(1)).notify_key().unwrap();

    assert_eq!(m.on_notification(ka, 10_000), Some(TagId(0)));
    assert_eq!(m.on_notification(ka, 10_300), None);
    // Other tag is independent.
    assert_eq!(m.on_notification(kb, 10_300), Some(TagId(1)));
    assert_eq!(m.on_notification(ka, 10_900), Some(TagId(0)));
    assert_eq!(m.registry().tag(TagId(0)).last_press_ms(), Some(10_900));
}

#[test]
fn press_sounds_buzzer() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    let key = m.registry().tag(TagId(0)).notify_key().unwrap();

    // Let the connect beep run out first.
    for t in 1..=11 {
        block_on(m.poll(&mut central, t * 100));
    }
    assert!(!m.feedback().outputs().buzzer);

    m.on_notification(key, 2_000);
    assert!(m.feedback().outputs().buzzer);
    assert!(m.feedback().is_sounding());
}

#[test]
fn notification_after_disconnect_is_ignored() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    let key = m.registry().tag(TagId(0)).notify_key().unwrap();

    central.drop_link(A);
    m.on_disconnected(&A);
    assert_eq!(m.on_notification(key, 5_000), None);
    assert_eq!(m.registry().tag(TagId(0)).last_press_ms(), None);
}

#[test]
fn notification_from_previous_connection_is_ignored() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    let old = m.registry().tag(TagId(0)).notify_key().unwrap();

    central.drop_link(A);
    m.on_disconnected(&A);
    connect(&mut m, &mut central, A, 5_000);
    let new = m.registry().tag(TagId(0)).notify_key().unwrap();

    assert_ne!(old, new);
    assert_eq!(m.on_notification(old, 6_000), None);
    assert_eq!(m.on_notification(new, 6_000), Some(TagId(0)));
}

#[test]
fn cycle_skips_unreachable_and_connected_tags() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    let report = block_on(m.run_cycle(&mut central, 5_000));
    assert!(report.attempted.is_empty());
    assert_eq!(central.connects(), 1);
}

#[test]
fn failed_connect_keeps_tag_reachable() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    central.refuse = true;
    m.on_advertisement(&B, -70, &[]);

    let report = block_on(m.run_cycle(&mut central, 0));
    assert_eq!(&report.failed[..], &[TagId(1)]);
    assert_eq!(m.registry().tag(TagId(1)).state(), TagState::Reachable);

    // Retried next cycle without a fresh advertisement.
    let report = block_on(m.run_cycle(&mut central, 5_000));
    assert_eq!(&report.attempted[..], &[TagId(1)]);
    assert_eq!(central.connects(), 2);
}

#[test]
fn link_that_never_came_up_counts_as_failure() {
    struct DeadOnArrival(TestCentral);

    impl Central for DeadOnArrival {
        type Link = TestLink;

        async fn connect(&mut self, tag: TagId, address: &TagAddress) -> Result<TestLink, Error> {
            let link = self.0.connect(tag, address).await?;
            link.0.set(false);
            Ok(link)
        }

        async fn read_battery(&mut self, link: &TestLink) -> Result<u8, Error> {
            self.0.read_battery(link).await
        }

        async fn subscribe_button(&mut self, link: &TestLink, key: NotifyKey) -> Result<Cccd, Error> {
            self.0.subscribe_button(link, key).await
        }

        fn start_scan(&mut self, window: &ScanWindow) {
            self.0.start_scan(window)
        }

        fn stop_scan(&mut self) {
            self.0.stop_scan()
        }

        fn clear_results(&mut self) {
            self.0.clear_results()
        }
    }

    let mut m = monitor();
    let mut central = DeadOnArrival(TestCentral::new());
    m.on_advertisement(&A, -50, &[]);
    let report = block_on(m.run_cycle(&mut central, 0));
    assert_eq!(&report.failed[..], &[TagId(0)]);
    assert!(m.registry().tag(TagId(0)).link().is_none());
    assert!(m.registry().tag(TagId(0)).is_reachable());
}

#[test]
fn battery_and_button_failures_do_not_abort_connection() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    central.battery = Err(Error::CharacteristicNotFound);
    central.button = Err(Error::NotNotifiable);
    connect(&mut m, &mut central, A, 0);

    let tag = m.registry().tag(TagId(0));
    assert_eq!(tag.state(), TagState::Connected);
    assert_eq!(tag.battery(), None);
    assert!(tag.notify_key().is_none());
    // No subscription, no beep.
    assert!(!m.feedback().outputs().buzzer);
    assert!(m.feedback().outputs().indicator);
}

#[test]
fn missing_cccd_still_subscribes() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    central.button = Ok(Cccd::Missing);
    connect(&mut m, &mut central, A, 0);
    assert!(m.registry().tag(TagId(0)).notify_key().is_some());
    assert!(m.feedback().outputs().buzzer);
}

#[test]
fn battery_level_is_remembered() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    central.battery = Ok(42);
    connect(&mut m, &mut central, A, 0);
    assert_eq!(m.registry().tag(TagId(0)).battery(), Some(42));
}

#[test]
fn dead_link_is_reaped_instead_of_reconnected() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    central.drop_link(A);

    let report = block_on(m.run_cycle(&mut central, 5_000));
    assert_eq!(&report.reaped[..], &[TagId(0)]);
    assert!(report.attempted.is_empty());
    assert_eq!(m.registry().tag(TagId(0)).state(), TagState::Unreachable);
    assert!(m.registry().tag(TagId(0)).notify_key().is_none());
    assert!(!m.feedback().outputs().indicator);

    // The late event is now harmless.
    assert_eq!(m.on_disconnected(&A), Some(TagId(0)));
    assert_eq!(central.connects(), 1);
}

#[test]
fn scan_restart_is_stop_clear_start() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    m.on_connected(&A);
    block_on(m.poll(&mut central, 0));
    assert_eq!(central.ops, [Op::Stop, Op::Clear, Op::Start]);
    assert!(!m.scan_restart_pending());

    // Nothing pending, nothing done.
    block_on(m.poll(&mut central, 100));
    assert_eq!(central.ops.len(), 3);
}

#[test]
fn restart_is_serviced_between_cycles() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    block_on(m.poll(&mut central, 0));
    m.on_connected(&A);
    block_on(m.poll(&mut central, 100));
    assert_eq!(central.ops, [Op::Stop, Op::Clear, Op::Start]);
}

#[test]
fn cycles_follow_reconnect_interval() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    central.refuse = true;
    m.on_advertisement(&A, -50, &[]);

    let mut now = 0;
    while now < 12_000 {
        block_on(m.handle(TagEvent::Tick, &mut central, now));
        now += 100;
    }
    // Cycles at 0, 5000 and 10000.
    assert_eq!(central.connects(), 3);
}

#[test]
fn connect_beep_ends_after_its_duration() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    block_on(m.poll(&mut central, 0));
    block_on(m.handle(advertise(A), &mut central, 50));
    // Next cycle at 5000 connects and starts the 1000 ms beep.
    let mut now = 100;
    while now <= 5_000 {
        block_on(m.poll(&mut central, now));
        now += 100;
    }
    assert!(m.feedback().outputs().buzzer);
    while now < 6_000 {
        block_on(m.poll(&mut central, now));
        now += 100;
    }
    assert!(m.feedback().outputs().buzzer);
    block_on(m.poll(&mut central, 6_000));
    assert!(!m.feedback().outputs().buzzer);
}

#[test]
fn scan_stops_early_when_configured() {
    let mut m = monitor_with(MonitorConfig {
        stop_scan_when_all_found: true,
        ..MonitorConfig::default()
    });
    let mut central = TestCentral::new();
    block_on(m.handle(advertise(A), &mut central, 0));
    assert!(central.ops.is_empty());
    block_on(m.handle(advertise(B), &mut central, 0));
    assert_eq!(central.ops, [Op::Stop]);
    // Repeats do not stop again.
    block_on(m.handle(advertise(B), &mut central, 0));
    assert_eq!(central.ops, [Op::Stop]);
}

#[test]
fn scan_keeps_running_by_default() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    block_on(m.handle(advertise(A), &mut central, 0));
    block_on(m.handle(advertise(B), &mut central, 0));
    assert!(central.ops.is_empty());
}

#[test]
fn notification_event_goes_through_debounce() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    let key = m.registry().tag(TagId(0)).notify_key().unwrap();
    let press = |k| TagEvent::Notification {
        key: k,
        payload: heapless::Vec::from_slice(&[0x01]).unwrap(),
    };

    block_on(m.handle(press(key), &mut central, 7_000));
    block_on(m.handle(press(key), &mut central, 7_100));
    assert_eq!(m.registry().tag(TagId(0)).last_press_ms(), Some(7_000));
}

#[test]
fn disconnect_event_via_handle() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    connect(&mut m, &mut central, A, 0);
    central.drop_link(A);
    block_on(m.handle(TagEvent::Disconnected(A), &mut central, 1_000));
    assert_eq!(m.registry().tag(TagId(0)).state(), TagState::Unreachable);
    assert!(m.scan_restart_pending());
}

#[test]
fn connect_beep_survives_slow_connect() {
    let mut m = monitor();
    let mut central = TestCentral::new();
    block_on(m.handle(advertise(A), &mut central, 0));
    block_on(m.poll(&mut central, 0));
    assert!(m.feedback().outputs().buzzer);

    // The connect held the loop for 1.2 s; the next tick still only counts
    // as one.
    block_on(m.poll(&mut central, 1_300));
    assert!(m.feedback().outputs().buzzer);
    for t in 1..=8 {
        block_on(m.poll(&mut central, 1_300 + t * 100));
        assert!(m.feedback().outputs().buzzer);
    }
    block_on(m.poll(&mut central, 2_200));
    assert!(!m.feedback().outputs().buzzer);
}

#[test]
fn restart_leaves_scan_off_when_all_found() {
    let mut m = monitor_with(MonitorConfig {
        stop_scan_when_all_found: true,
        ..MonitorConfig::default()
    });
    let mut central = TestCentral::new();
    block_on(m.handle(advertise(A), &mut central, 0));
    block_on(m.handle(advertise(B), &mut central, 0));
    central.ops.clear();

    m.on_connected(&A);
    m.service_scan(&mut central);
    assert_eq!(central.ops, [Op::Stop, Op::Clear]);

    // Once a tag is lost the scan comes back.
    m.on_disconnected(&B);
    m.service_scan(&mut central);
    assert_eq!(central.ops, [Op::Stop, Op::Clear, Op::Stop, Op::Clear, Op::Start]);
}
