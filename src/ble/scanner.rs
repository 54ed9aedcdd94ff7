//! BLE GAP scanner - hears tag advertisements.
//!
//! Uses the SoftDevice Central-role scanning API. Only roster tags are
//! reported into [`EVENTS`], each once per scan; clearing the results makes
//! them eligible again, which is how a disconnected tag gets re-armed.

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use itag_finder::adv::{AdvData, ReportFilter};
use itag_finder::config::{KNOWN_TAGS, MAX_TAGS};
use itag_finder::{ScanWindow, TagAddress, TagEvent};
use nrf_softdevice::ble::central;
use nrf_softdevice::Softdevice;

use super::EVENTS;

#[derive(Clone, Copy, defmt::Format)]
pub enum ScanCommand {
    /// (Re)start with the given parameters.
    Start(ScanWindow),
    Stop,
    /// Forget advertisers already reported.
    Clear,
    /// Start again with the last parameters, if any.
    Resume,
}

static COMMANDS: Channel<CriticalSectionRawMutex, ScanCommand, 4> = Channel::new();
static IDLE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub fn command(cmd: ScanCommand) {
    if COMMANDS.try_send(cmd).is_err() {
        warn!("scan command queue full, dropping {}", cmd);
    }
}

/// Stop scanning and wait until the radio is no longer scanning.
pub async fn pause() {
    IDLE.reset();
    COMMANDS.send(ScanCommand::Stop).await;
    IDLE.wait().await;
}

pub fn resume() {
    command(ScanCommand::Resume);
}

/// 0.625 ms units as the SoftDevice expects them.
fn ms_to_units(ms: u16) -> u32 {
    u32::from(ms) * 1000 / 625
}

#[embassy_executor::task]
pub async fn scan_task(sd: &'static Softdevice) -> ! {
    let mut window: Option<ScanWindow> = None;
    let mut filter = ReportFilter::new(KNOWN_TAGS);
    let mut running = false;

    loop {
        let params = match (running, window) {
            (true, Some(params)) => params,
            _ => {
                running = false;
                IDLE.signal(());
                match COMMANDS.receive().await {
                    ScanCommand::Start(params) => {
                        window = Some(params);
                        running = true;
                    }
                    ScanCommand::Resume => running = window.is_some(),
                    ScanCommand::Clear => filter.clear(),
                    ScanCommand::Stop => {}
                }
                continue;
            }
        };

        info!("scan started");
        match select(COMMANDS.receive(), scan(sd, &params, &mut filter)).await {
            Either::First(cmd) => match cmd {
                ScanCommand::Start(params) => window = Some(params),
                ScanCommand::Resume => {}
                ScanCommand::Clear => filter.clear(),
                ScanCommand::Stop => {
                    info!("scan stopped");
                    running = false;
                }
            },
            Either::Second(Ok(())) => {
                info!("scan ended");
                running = params.duration_secs == 0;
            }
            Either::Second(Err(e)) => {
                warn!("BLE scan ended with error: {}", e);
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn scan(
    sd: &Softdevice,
    params: &ScanWindow,
    filter: &mut ReportFilter<MAX_TAGS>,
) -> Result<(), central::ScanError> {
    let config = central::ScanConfig {
        active: params.active,
        interval: ms_to_units(params.interval_ms),
        window: ms_to_units(params.window_ms),
        timeout: params.duration_secs.saturating_mul(100),
        ..Default::default()
    };

    let result = central::scan(sd, &config, |report| {
        let address = TagAddress::from_le_bytes(report.peer_addr.addr);
        if !filter.wants(&address) {
            return None;
        }

        let data =
            unsafe { core::slice::from_raw_parts(report.data.p_data, report.data.len as usize) };
        let mut adv = AdvData::new();
        let _ = adv.extend_from_slice(&data[..data.len().min(adv.capacity())]);

        let event = TagEvent::Advertisement {
            address,
            rssi: report.rssi,
            data: adv,
        };
        // Only remember the tag once it is queued, so a full queue does not
        // swallow it for the rest of the scan.
        if EVENTS.try_send(event).is_ok() {
            filter.mark_reported(address);
        }
        None::<()>
    })
    .await;

    match result {
        Ok(()) | Err(central::ScanError::Timeout) => Ok(()),
        Err(e) => Err(e),
    }
}
