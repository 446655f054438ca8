//! SoftDevice GATT client for the Wearfit vendor service.
//!
//! Written by hand rather than with `#[nrf_softdevice::gatt_client]`:
//! discovery has to be observable step by step (service, notify
//! characteristic, CCCD, write characteristic), so the client only
//! records what the SoftDevice found and `SoftdeviceLink` answers the
//! individual lookups from that table.

use crate::config::{ACTIVE_PROFILE, MAX_NOTIFICATION_LEN};
use heapless::Vec;
use nrf_softdevice::ble::gatt_client::{self, Characteristic, Descriptor, DiscoverError};
use nrf_softdevice::ble::{Connection, HvxType, Uuid};

/// Client Characteristic Configuration Descriptor.
const CCCD_UUID16: u16 = 0x2902;

/// The vendor service exposes two characteristics; leave some headroom.
const MAX_CHARACTERISTICS: usize = 6;

#[derive(Clone, Copy)]
pub struct CharacteristicEntry {
    pub uuid: Option<Uuid>,
    pub value_handle: u16,
    pub cccd_handle: Option<u16>,
}

/// A raw notification, tagged with the characteristic that sent it.
pub struct Notification {
    pub value_handle: u16,
    pub data: Vec<u8, MAX_NOTIFICATION_LEN>,
}

pub struct WearfitClient {
    characteristics: Vec<CharacteristicEntry, MAX_CHARACTERISTICS>,
}

impl WearfitClient {
    pub fn value_handle(&self, uuid: &Uuid) -> Option<u16> {
        self.characteristics
            .iter()
            .find(|c| c.uuid.as_ref() == Some(uuid))
            .map(|c| c.value_handle)
    }

    pub fn cccd_handle(&self, value_handle: u16) -> Option<u16> {
        self.characteristics
            .iter()
            .find(|c| c.value_handle == value_handle)
            .and_then(|c| c.cccd_handle)
    }
}

impl gatt_client::Client for WearfitClient {
    type Event = Notification;

    fn uuid() -> Uuid {
        Uuid::new_128(&ACTIVE_PROFILE.layout.service)
    }

    fn new_undiscovered(_conn: Connection) -> Self {
        Self {
            characteristics: Vec::new(),
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        descriptors: &[Descriptor],
    ) {
        let cccd = Uuid::new_16(CCCD_UUID16);
        let cccd_handle = descriptors
            .iter()
            .find(|d| d.uuid == Some(cccd))
            .map(|d| d.handle);

        let entry = CharacteristicEntry {
            uuid: characteristic.uuid,
            value_handle: characteristic.handle_value,
            cccd_handle,
        };
        if self.characteristics.push(entry).is_err() {
            defmt::warn!(
                "characteristic table full, ignoring handle {=u16:#06x}",
                characteristic.handle_value
            );
        }
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        // Missing characteristics are reported by the lookups, one step at a time.
        Ok(())
    }

    fn on_hvx(
        &self,
        _conn: &Connection,
        type_: HvxType,
        handle: u16,
        data: &[u8],
    ) -> Option<Self::Event> {
        if !matches!(type_, HvxType::Notification) {
            return None;
        }
        let n = data.len().min(MAX_NOTIFICATION_LEN);
        let mut buf = Vec::new();
        let _ = buf.extend_from_slice(&data[..n]);
        Some(Notification {
            value_handle: handle,
            data: buf,
        })
    }
}
