//! Radio-facing value types shared by the scan filter, the link
//! supervisor, and service discovery.
//!
//! Addresses and UUIDs are kept as raw byte arrays in the order the
//! SoftDevice delivers them (little-endian); nothing here reinterprets
//! them numerically.

/// 6-byte BLE device address, as delivered by the radio stack.
pub type Address = [u8; 6];

/// 128-bit UUID in little-endian byte order.
pub type Uuid128 = [u8; 16];

/// Opaque identifier of an active link, valid from connect to disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// The two characteristics of the vendor service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// Device → central telemetry (notify).
    Notify,
    /// Central → device commands (write).
    Write,
}

/// Attribute handles resolved by service discovery.
///
/// Only meaningful together with the `ConnHandle` that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredEndpoints {
    /// Value handle of the notify characteristic.
    pub notify: u16,
    /// Value handle of the write characteristic.
    pub write: u16,
    /// Whether the CCCD write succeeded (live telemetry available).
    pub notify_enabled: bool,
}

/// A single advertising report, borrowed from the scan callback.
#[derive(Clone, Copy, Debug)]
pub struct AdvertisementReport<'a> {
    pub address: Address,
    /// Received Signal Strength Indicator (dBm).
    pub rssi: i8,
    pub connectable: bool,
    pub directed: bool,
    /// Raw AD structures (advertising data or scan response).
    pub data: &'a [u8],
}

/// Events the radio stack delivers to the link supervisor, in order.
#[derive(Clone, Copy, Debug)]
pub enum RadioEvent<'a> {
    Advertisement(AdvertisementReport<'a>),
    Connected(ConnHandle),
    ConnectFailed,
    Disconnected { handle: ConnHandle, reason: u8 },
    Notification { handle: ConnHandle, value_handle: u16, data: &'a [u8] },
}
