//! Outgoing device commands.

use super::frame::{self, FrameBuf};
use crate::error::Error;

/// Opcodes used by the wristband protocol.
pub mod opcode {
    /// Vibrate the band.
    pub const RING_VIBRATE: u8 = 0xB1;
    /// Battery level request.
    pub const BATTERY: u8 = 0xB2;
    /// Battery level report (device → central).
    pub const BATTERY_REPORT: u8 = 0x91;
    /// Single measurement request/response; sub-code selects the sensor.
    pub const MEASUREMENT: u8 = 0x31;
    /// Push a text notification to the band's display.
    pub const TEXT_NOTIFICATION: u8 = 0x72;
}

/// Measurement sub-codes following `opcode::MEASUREMENT`.
pub mod measurement {
    pub const HEART_RATE: u8 = 0x0A;
    pub const BLOOD_PRESSURE: u8 = 0x22;
    /// Trailing "start" flag on measurement requests.
    pub const START: u8 = 0x01;
}

/// Fixed params preceding the UTF-8 body of a text notification.
pub const TEXT_PREFIX: [u8; 3] = [0x80, 0x03, 0x02];

/// A command the central can send to the band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    RingVibrate,
    HeartRateRequest,
    BloodPressureRequest,
    BatteryRequest,
    TextNotification(&'a str),
}

impl Command<'_> {
    pub fn opcode(&self) -> u8 {
        match self {
            Command::RingVibrate => opcode::RING_VIBRATE,
            Command::HeartRateRequest | Command::BloodPressureRequest => opcode::MEASUREMENT,
            Command::BatteryRequest => opcode::BATTERY,
            Command::TextNotification(_) => opcode::TEXT_NOTIFICATION,
        }
    }

    /// Encode into wire bytes.
    pub fn encode(&self) -> Result<FrameBuf, Error> {
        let op = self.opcode();
        match self {
            Command::RingVibrate => frame::encode(op, &[0x80, 0x01]),
            Command::HeartRateRequest => {
                frame::encode(op, &[measurement::HEART_RATE, measurement::START])
            }
            Command::BloodPressureRequest => {
                frame::encode(op, &[measurement::BLOOD_PRESSURE, measurement::START])
            }
            Command::BatteryRequest => frame::encode(op, &[0x80]),
            Command::TextNotification(text) => {
                frame::encode_parts(op, &[&TEXT_PREFIX, text.as_bytes()])
            }
        }
    }
}
