//! Unified error type for the Wearfit central.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.
//!
//! Malformed inbound notifications are not an error: the codec degrades
//! them to `TelemetryEvent::Unknown`.

use crate::ble::types::Endpoint;

/// Top-level error type used across the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    /// The vendor service is not present on the connected peripheral.
    ServiceNotFound,

    /// A mandatory characteristic of the vendor service is missing.
    CharacteristicNotFound(Endpoint),

    /// The CCCD write that turns on notifications was refused.
    /// The link stays up without live telemetry.
    NotifyEnableFailed,

    /// The link is not in the `Ready` state.
    NotReady,

    // Codec
    /// Encoded frame would exceed the transport's maximum write size.
    FrameTooLarge { len: usize, max: usize },

    /// Text for the band is not valid UTF-8.
    InvalidText,
}

impl Error {
    /// `true` for failures that end the current connection attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ServiceNotFound | Error::CharacteristicNotFound(_)
        )
    }
}

/// Subset of radio-stack errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// GAP / GATT raw error code from the SoftDevice.
    Raw(u32),
    /// Scan was cancelled or could not start.
    ScanFailed,
    /// Connection attempt failed.
    ConnectFailed,
    /// Characteristic write was rejected by the stack.
    WriteFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}
