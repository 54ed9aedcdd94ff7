//! itag-finder firmware entry point.
//!
//! Keeps BLE connections to the configured iTags, lights the LED while at
//! least one is connected and beeps on every new connection and button
//! press.

#![no_std]
#![no_main]

mod ble;
mod outputs;

use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::Priority;
use embassy_nrf::pwm::SimplePwm;
use embassy_time::{Duration, Instant, Ticker};
use itag_finder::config;
use itag_finder::{MonitorConfig, TagEvent, TagMonitor, TagRegistry};
use nrf_softdevice::Softdevice;
use panic_probe as _;

use crate::ble::{NrfCentral, EVENTS};
use crate::outputs::PinOutputs;

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("start itag finder");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&ble::softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(ble::scanner::scan_task(sd)));
    for (slot, address) in config::KNOWN_TAGS.iter().enumerate() {
        unwrap!(spawner.spawn(ble::links::link_task(slot, *address)));
    }

    let led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);
    let buzzer = SimplePwm::new_1ch(p.PWM0, p.P0_28);

    let registry = unwrap!(TagRegistry::new(config::KNOWN_TAGS));
    let mut monitor = TagMonitor::new(
        registry,
        PinOutputs::new(led, buzzer),
        MonitorConfig::default(),
    );
    let mut central = NrfCentral::new(sd);
    monitor.start(&mut central);

    let mut ticker = Ticker::every(Duration::from_millis(config::POLL_INTERVAL_MS));
    loop {
        let event = match select(EVENTS.receive(), ticker.next()).await {
            Either::First(event) => event,
            Either::Second(()) => TagEvent::Tick,
        };
        monitor
            .handle(event, &mut central, Instant::now().as_millis())
            .await;
    }
}
