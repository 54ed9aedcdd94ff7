//! Per-tag connection tasks.
//!
//! One task per roster slot. It is handed the connection after a successful
//! connect, optionally the button client after subscription, and posts
//! `Disconnected` once the link is gone.

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use itag_finder::config::MAX_TAGS;
use itag_finder::{NotifyKey, TagAddress, TagEvent};
use nrf_softdevice::ble::{gatt_client, Connection};

use super::gatt::{ButtonClient, ButtonEvent};
use super::EVENTS;

pub enum LinkCommand {
    Open(Connection),
    Subscribed(ButtonClient, NotifyKey),
}

static LINKS: [Channel<CriticalSectionRawMutex, LinkCommand, 2>; MAX_TAGS] =
    [const { Channel::new() }; MAX_TAGS];

pub fn open(slot: usize, conn: Connection) {
    if LINKS[slot].try_send(LinkCommand::Open(conn)).is_err() {
        warn!("link {} command queue full", slot);
    }
}

pub fn subscribed(slot: usize, client: ButtonClient, key: NotifyKey) {
    if LINKS[slot].try_send(LinkCommand::Subscribed(client, key)).is_err() {
        warn!("link {} command queue full", slot);
    }
}

async fn wait_closed(conn: &Connection) {
    while conn.handle().is_some() {
        Timer::after(Duration::from_millis(250)).await;
    }
}

#[embassy_executor::task(pool_size = MAX_TAGS)]
pub async fn link_task(slot: usize, address: TagAddress) -> ! {
    let commands = &LINKS[slot];

    loop {
        let conn = match commands.receive().await {
            LinkCommand::Open(conn) => conn,
            LinkCommand::Subscribed(..) => {
                warn!("link {}: subscription without connection", slot);
                continue;
            }
        };

        loop {
            match select(wait_closed(&conn), commands.receive()).await {
                Either::First(()) => break,
                Either::Second(LinkCommand::Subscribed(client, key)) => {
                    info!("link {}: listening for button presses", slot);
                    let _ = gatt_client::run(&conn, &client, |event| match event {
                        ButtonEvent::Pressed(payload) => {
                            if EVENTS
                                .try_send(TagEvent::Notification { key, payload })
                                .is_err()
                            {
                                warn!("event queue full - dropping button press");
                            }
                        }
                    })
                    .await;
                    break;
                }
                Either::Second(LinkCommand::Open(_)) => {
                    warn!("link {}: already open", slot);
                }
            }
        }

        EVENTS.send(TagEvent::Disconnected(address)).await;
    }
}
