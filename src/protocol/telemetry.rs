//! Inbound notification decoding.
//!
//! Decoding never fails: anything that does not match a known,
//! complete pattern comes back as `TelemetryEvent::Unknown`.

use super::command::{measurement, opcode};
use super::frame::OPCODE_OFFSET;
use crate::config::MAX_NOTIFICATION_LEN;
use heapless::Vec;

/// Raw notification bytes (truncated to `MAX_NOTIFICATION_LEN`).
pub type RawNotification = Vec<u8, MAX_NOTIFICATION_LEN>;

const SUBCODE_OFFSET: usize = OPCODE_OFFSET + 1;
const HEART_RATE_OFFSET: usize = 6;
const BATTERY_OFFSET: usize = 7;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryEvent {
    HeartRate { bpm: u8 },
    Battery { percent: u8 },
    Unknown { raw: RawNotification },
}

/// Which decoders are active. Inactive ones yield `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decoders {
    pub heart_rate: bool,
    pub battery: bool,
}

impl Decoders {
    pub const ALL: Self = Self {
        heart_rate: true,
        battery: true,
    };
    pub const NONE: Self = Self {
        heart_rate: false,
        battery: false,
    };
}

/// Decode with every decoder enabled.
pub fn decode(data: &[u8]) -> TelemetryEvent {
    decode_with(data, Decoders::ALL)
}

pub fn decode_with(data: &[u8], decoders: Decoders) -> TelemetryEvent {
    let known = match data.get(OPCODE_OFFSET) {
        Some(&opcode::MEASUREMENT) if decoders.heart_rate => heart_rate(data),
        Some(&opcode::BATTERY_REPORT) if decoders.battery => data
            .get(BATTERY_OFFSET)
            .map(|&percent| TelemetryEvent::Battery { percent }),
        _ => None,
    };
    known.unwrap_or_else(|| unknown(data))
}

/// Heart-rate response: `.. 31 0A <bpm>`, or `.. 31 0A 01 <bpm>` when the
/// band echoes the request's start flag. A reading of 1 bpm is not
/// physiological, so a `01` at the value offset is always the flag. A
/// bare echo (`.. 31 0A 01`) carries no reading.
fn heart_rate(data: &[u8]) -> Option<TelemetryEvent> {
    if data.get(SUBCODE_OFFSET) != Some(&measurement::HEART_RATE) {
        return None;
    }
    let bpm = match (data.get(HEART_RATE_OFFSET), data.get(HEART_RATE_OFFSET + 1)) {
        (Some(&measurement::START), Some(&bpm)) => bpm,
        (Some(&measurement::START), None) | (None, _) => return None,
        (Some(&bpm), _) => bpm,
    };
    Some(TelemetryEvent::HeartRate { bpm })
}

fn unknown(data: &[u8]) -> TelemetryEvent {
    let n = data.len().min(MAX_NOTIFICATION_LEN);
    let mut raw = RawNotification::new();
    let _ = raw.extend_from_slice(&data[..n]);
    TelemetryEvent::Unknown { raw }
}
