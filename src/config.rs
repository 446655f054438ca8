//! Application-wide constants and compile-time configuration.
//!
//! UUIDs, radio timing, frame limits and the driver profile all live
//! here so they can be tuned in one place.

use crate::ble::discovery::ServiceLayout;
use crate::ble::filter::PeripheralIdentity;
use crate::ble::types::{Address, Uuid128};
use crate::dispatch::CommandSet;
use crate::protocol::{Command, Decoders};

// Wearfit vendor service (128-bit UUIDs, little-endian as on the wire)

pub const WEARFIT_SERVICE_UUID: Uuid128 = [
    0x9e, 0xca, 0xdc, 0x24, 0x0e, 0xe5, 0xa9, 0xe0, 0x93, 0xf3, 0xa3, 0xb5, 0x01, 0x00, 0x40, 0x6e,
];

pub const WEARFIT_WRITE_UUID: Uuid128 = [
    0x9e, 0xca, 0xdc, 0x24, 0x0e, 0xe5, 0xa9, 0xe0, 0x93, 0xf3, 0xa3, 0xb5, 0x02, 0x00, 0x40, 0x6e,
];

pub const WEARFIT_NOTIFY_UUID: Uuid128 = [
    0x9e, 0xca, 0xdc, 0x24, 0x0e, 0xe5, 0xa9, 0xe0, 0x93, 0xf3, 0xa3, 0xb5, 0x03, 0x00, 0x40, 0x6e,
];

pub const WEARFIT_LAYOUT: ServiceLayout = ServiceLayout {
    service: WEARFIT_SERVICE_UUID,
    notify: WEARFIT_NOTIFY_UUID,
    write: WEARFIT_WRITE_UUID,
};

// Target peripheral

/// Complete Local Name advertised by the band (exact match, no terminator).
pub const TARGET_LOCAL_NAME: &[u8] = b"C1 Plus";

/// Bands accepted by address in the telemetry profile.
/// Byte order as reported by the SoftDevice. Replace with your own device.
pub const TARGET_ADDRESSES: &[Address] = &[[0x3C, 0x71, 0xBF, 0x8A, 0x2D, 0xE4]];

// BLE

/// Scan interval and window (in 0.625 ms units): 100 ms / 50 ms.
pub const BLE_SCAN_INTERVAL: u32 = 160;
pub const BLE_SCAN_WINDOW: u32 = 80;

/// Active scanning - the band only reveals its name in the scan response.
pub const BLE_SCAN_ACTIVE: bool = true;

/// Scan timeout (10 ms units). 0 = scan until a match.
pub const BLE_SCAN_TIMEOUT: u16 = 0;

/// Give up on a connect request after this long (10 ms units). 500 = 5 s.
pub const BLE_CONNECT_TIMEOUT: u16 = 500;

/// BLE connection interval range (in 1.25 ms units): 30-50 ms.
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Default ATT MTU; the band never negotiates a larger one.
pub const ATT_MTU: usize = 23;

/// Largest frame a single write can carry (ATT MTU minus opcode + handle).
pub const MAX_FRAME_LEN: usize = ATT_MTU - 3;

/// Notifications are kept up to this many bytes.
pub const MAX_NOTIFICATION_LEN: usize = ATT_MTU - 3;

/// Console text buffer. Longer than any frame so oversized text reaches
/// the encoder and is rejected there.
pub const MAX_TEXT_LEN: usize = 64;

// Tasks

/// Period of the telemetry poll task (ms).
pub const TELEMETRY_POLL_MS: u64 = 1000;

/// Pause before rescanning after the scanner itself failed (ms).
pub const SCAN_RETRY_MS: u64 = 500;

pub const WRITE_QUEUE_DEPTH: usize = 4;
pub const TELEMETRY_QUEUE_DEPTH: usize = 8;

// USB console

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "wearfit-central";
pub const USB_PRODUCT: &str = "Wearfit Central Console";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// CDC-ACM bulk endpoint size.
pub const USB_CDC_PACKET_SIZE: u16 = 64;

/// GAP device name of the central itself.
pub const CENTRAL_NAME: &[u8] = b"Wearfit Central";

// Driver profiles

/// Everything that differs between deployments of the driver.
#[derive(Clone, Copy, Debug)]
pub struct DriverProfile {
    /// Which band to connect to.
    pub target: PeripheralIdentity,
    /// Vendor service and characteristic UUIDs.
    pub layout: ServiceLayout,
    /// Console commands that may be dispatched.
    pub commands: CommandSet,
    /// Sent once right after discovery succeeds.
    pub greeting: Option<Command<'static>>,
    /// Sent every `TELEMETRY_POLL_MS` while the link is ready.
    pub poll: Option<Command<'static>>,
    /// Notification decoders in use.
    pub decoders: Decoders,
}

impl DriverProfile {
    /// Name-matched band, buzzes on connect and once a second after. The
    /// console can only trigger vibration.
    pub const fn vibration() -> Self {
        Self {
            target: PeripheralIdentity::by_name(TARGET_LOCAL_NAME),
            layout: WEARFIT_LAYOUT,
            commands: CommandSet::VIBRATE_ONLY,
            greeting: Some(Command::RingVibrate),
            poll: Some(Command::RingVibrate),
            decoders: Decoders::NONE,
        }
    }

    /// Allowlisted band only, polls heart rate and forwards decoded
    /// telemetry.
    pub const fn telemetry() -> Self {
        Self {
            target: PeripheralIdentity::by_addresses(TARGET_ADDRESSES),
            layout: WEARFIT_LAYOUT,
            commands: CommandSet::ALL,
            greeting: Some(Command::RingVibrate),
            poll: Some(Command::HeartRateRequest),
            decoders: Decoders::ALL,
        }
    }
}

/// Profile the firmware runs with.
pub const ACTIVE_PROFILE: DriverProfile = DriverProfile::telemetry();
