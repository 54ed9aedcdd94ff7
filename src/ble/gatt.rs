//! GATT clients for the two services an iTag exposes.

use itag_finder::config::{BUTTON_CHAR_UUID, BUTTON_SERVICE_UUID, CCCD_UUID};
use itag_finder::event::MAX_NOTIFY_LEN;
use itag_finder::Cccd;
use nrf_softdevice::ble::gatt_client::{self, Characteristic, Descriptor, DiscoverError, HvxType};
use nrf_softdevice::ble::{Connection, Uuid};

/// Battery Service, generated by the `gatt_client` macro.
#[nrf_softdevice::gatt_client(uuid = "180f")]
pub struct BatteryServiceClient {
    /// Battery Level in percent.
    #[characteristic(uuid = "2a19", read)]
    pub battery_level: u8,
}

/// Button press payload (opaque).
pub type ButtonPayload = heapless::Vec<u8, MAX_NOTIFY_LEN>;

pub enum ButtonEvent {
    Pressed(ButtonPayload),
}

/// Hand-written client for the iTag button service.
///
/// The generated clients refuse a notify characteristic without a CCCD,
/// and many iTags omit it. This one records the descriptor when present
/// and otherwise falls back to the handle right after the value.
pub struct ButtonClient {
    value_handle: u16,
    cccd_handle: Option<u16>,
    write_handle: u16,
    can_notify: bool,
}

impl ButtonClient {
    pub fn can_notify(&self) -> bool {
        self.can_notify
    }

    pub fn cccd(&self) -> Cccd {
        if self.cccd_handle.is_some() {
            Cccd::Present
        } else {
            Cccd::Missing
        }
    }

    /// Where to write the subscription. Resolved at discovery.
    pub fn cccd_handle(&self) -> u16 {
        self.write_handle
    }
}

impl gatt_client::Client for ButtonClient {
    type Event = ButtonEvent;

    fn on_hvx(
        &self,
        _conn: &Connection,
        type_: HvxType,
        handle: u16,
        data: &[u8],
    ) -> Option<Self::Event> {
        if handle != self.value_handle || type_ != HvxType::Notification {
            return None;
        }
        let mut payload = ButtonPayload::new();
        let _ = payload.extend_from_slice(&data[..data.len().min(MAX_NOTIFY_LEN)]);
        Some(ButtonEvent::Pressed(payload))
    }

    fn uuid() -> Uuid {
        Uuid::new_16(BUTTON_SERVICE_UUID)
    }

    fn new_undiscovered(_conn: Connection) -> Self {
        Self {
            value_handle: 0,
            cccd_handle: None,
            write_handle: 0,
            can_notify: false,
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        descriptors: &[Descriptor],
    ) {
        if characteristic.uuid != Some(Uuid::new_16(BUTTON_CHAR_UUID)) {
            return;
        }
        self.value_handle = characteristic.handle_value;
        self.can_notify = characteristic.props.notify() != 0;
        self.cccd_handle = descriptors
            .iter()
            .find(|d| d.uuid == Some(Uuid::new_16(CCCD_UUID)))
            .map(|d| d.handle);
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        if self.value_handle == 0 {
            return Err(DiscoverError::ServiceIncomplete);
        }
        self.write_handle = Cccd::write_handle(self.value_handle, self.cccd_handle)
            .ok_or(DiscoverError::ServiceIncomplete)?;
        Ok(())
    }
}
