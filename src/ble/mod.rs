//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Central** role and
//! implements [`Central`] for the tag monitor:
//!
//! 1. **Scanner** - continuous active scan, each roster tag reported once
//!    per scan into the event channel.
//! 2. **GATT clients** - battery level read and the iTag button
//!    characteristic.
//! 3. **Links** - one task per tag slot that watches its connection, runs
//!    the notification loop once subscribed and reports the disconnect.
//!
//! Everything funnels into [`EVENTS`], consumed by the single main loop.

pub mod gatt;
pub mod links;
pub mod scanner;

use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use itag_finder::config;
use itag_finder::{
    BleError, Cccd, Central, Error, Link, NotifyKey, ScanWindow, TagAddress, TagEvent, TagId,
};
use nrf_softdevice::ble::gatt_client::{self, DiscoverError};
use nrf_softdevice::ble::{central, Address, AddressType, Connection};
use nrf_softdevice::{raw, Softdevice};

use self::gatt::{BatteryServiceClient, ButtonClient};
use self::scanner::ScanCommand;

/// Every radio event for the monitor goes through here.
pub static EVENTS: Channel<CriticalSectionRawMutex, TagEvent, 16> = Channel::new();

/// CCCD value enabling notifications.
const CCCD_NOTIFY: [u8; 2] = [0x01, 0x00];

const DEVICE_NAME: &[u8] = b"itag-finder";

pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: config::MAX_TAGS as u8,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: config::MAX_TAGS as u8,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// iTags ship with random static addresses; anything else is treated as
/// public.
pub fn to_softdevice_address(address: &TagAddress) -> Address {
    let kind = if address.is_random_static() {
        AddressType::RandomStatic
    } else {
        AddressType::Public
    };
    Address::new(kind, address.to_le_bytes())
}

fn discover_error(e: DiscoverError) -> Error {
    match e {
        DiscoverError::ServiceNotFound => Error::ServiceNotFound,
        DiscoverError::ServiceIncomplete => Error::CharacteristicNotFound,
        DiscoverError::Raw(e) => BleError::Raw(e as u32).into(),
        _ => BleError::DiscoveryFailed.into(),
    }
}

/// An open SoftDevice connection bound to a tag slot.
pub struct NrfLink {
    slot: usize,
    conn: Connection,
}

impl Link for NrfLink {
    fn is_connected(&self) -> bool {
        self.conn.handle().is_some()
    }
}

impl NrfLink {
    fn conn(&self) -> Result<&Connection, Error> {
        if self.is_connected() {
            Ok(&self.conn)
        } else {
            Err(Error::NotConnected)
        }
    }
}

pub struct NrfCentral {
    sd: &'static Softdevice,
}

impl NrfCentral {
    pub fn new(sd: &'static Softdevice) -> Self {
        Self { sd }
    }
}

impl Central for NrfCentral {
    type Link = NrfLink;

    async fn connect(&mut self, tag: TagId, address: &TagAddress) -> Result<NrfLink, Error> {
        // The SoftDevice cannot initiate a connection while our scan runs.
        scanner::pause().await;

        let peer = to_softdevice_address(address);
        let whitelist = [&peer];
        let conn_cfg = central::ConnectConfig {
            scan_config: central::ScanConfig {
                whitelist: Some(&whitelist),
                timeout: config::BLE_CONNECT_TIMEOUT,
                ..Default::default()
            },
            conn_params: raw::ble_gap_conn_params_t {
                min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
                max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
                slave_latency: config::BLE_SLAVE_LATENCY,
                conn_sup_timeout: config::BLE_SUP_TIMEOUT,
            },
            ..Default::default()
        };

        let conn = match central::connect(self.sd, &conn_cfg).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("connect to {} failed: {}", address, e);
                scanner::resume();
                return Err(BleError::ConnectFailed.into());
            }
        };

        let slot = tag.index();
        links::open(slot, conn.clone());
        if EVENTS.try_send(TagEvent::Connected(*address)).is_err() {
            // Nobody will ask for a restart; do not leave the scan paused.
            warn!("event queue full, resuming scan directly");
            scanner::resume();
        }
        Ok(NrfLink { slot, conn })
    }

    async fn read_battery(&mut self, link: &NrfLink) -> Result<u8, Error> {
        let client: BatteryServiceClient = gatt_client::discover(link.conn()?)
            .await
            .map_err(discover_error)?;
        client.battery_level_read().await.map_err(|e| match e {
            gatt_client::ReadError::Raw(e) => BleError::Raw(e as u32).into(),
            _ => BleError::ReadFailed.into(),
        })
    }

    async fn subscribe_button(&mut self, link: &NrfLink, key: NotifyKey) -> Result<Cccd, Error> {
        let conn = link.conn()?;
        let client: ButtonClient = gatt_client::discover(conn)
            .await
            .map_err(discover_error)?;
        info!("found button service");
        if !client.can_notify() {
            return Err(Error::NotNotifiable);
        }

        let cccd = client.cccd();
        gatt_client::write_without_response(conn, client.cccd_handle(), &CCCD_NOTIFY)
            .await
            .map_err(|e| match e {
                gatt_client::WriteError::Raw(e) => Error::from(BleError::Raw(e as u32)),
                _ => Error::from(BleError::NotifyFailed),
            })?;

        links::subscribed(link.slot, client, key);
        Ok(cccd)
    }

    fn start_scan(&mut self, window: &ScanWindow) {
        scanner::command(ScanCommand::Start(*window));
    }

    fn stop_scan(&mut self) {
        scanner::command(ScanCommand::Stop);
    }

    fn clear_results(&mut self) {
        scanner::command(ScanCommand::Clear);
    }
}
