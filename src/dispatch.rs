//! Command dispatcher - the one path every outgoing frame takes.
//!
//! Console triggers and the periodic poll both come through here, so the
//! `Ready` check cannot be bypassed. Sends are fire-and-forget: responses
//! arrive later on the notify path and are matched by opcode only.
//!
//! Check order: command enabled → link ready → frame encodes → sink
//! accepts. The first failing check decides the outcome and nothing is
//! sent.

use crate::ble::supervisor::Supervisor;
use crate::ble::types::ConnHandle;
use crate::config::{DriverProfile, MAX_TEXT_LEN};
use crate::error::Error;
use crate::protocol::Command;
use heapless::String;

/// Something a user or timer asked for. Owns its text so it can travel
/// through a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    RingVibrate,
    Battery,
    HeartRate,
    BloodPressure,
    Text(String<MAX_TEXT_LEN>),
}

impl Trigger {
    pub fn command(&self) -> Command<'_> {
        match self {
            Trigger::RingVibrate => Command::RingVibrate,
            Trigger::Battery => Command::BatteryRequest,
            Trigger::HeartRate => Command::HeartRateRequest,
            Trigger::BloodPressure => Command::BloodPressureRequest,
            Trigger::Text(text) => Command::TextNotification(text.as_str()),
        }
    }
}

/// Which commands a profile lets through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandSet {
    pub ring_vibrate: bool,
    pub battery: bool,
    pub heart_rate: bool,
    pub blood_pressure: bool,
    pub text: bool,
}

impl CommandSet {
    pub const ALL: Self = Self {
        ring_vibrate: true,
        battery: true,
        heart_rate: true,
        blood_pressure: true,
        text: true,
    };

    pub const VIBRATE_ONLY: Self = Self {
        ring_vibrate: true,
        battery: false,
        heart_rate: false,
        blood_pressure: false,
        text: false,
    };

    pub fn allows(&self, command: &Command<'_>) -> bool {
        match command {
            Command::RingVibrate => self.ring_vibrate,
            Command::BatteryRequest => self.battery,
            Command::HeartRateRequest => self.heart_rate,
            Command::BloodPressureRequest => self.blood_pressure,
            Command::TextNotification(_) => self.text,
        }
    }
}

/// Write path to the band. Returns `false` if the frame could not be
/// queued; no delivery confirmation is modelled.
pub trait FrameSink {
    fn send(&mut self, handle: ConnHandle, value_handle: u16, frame: &[u8]) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// Frame handed to the sink.
    Sent,
    /// Link not ready; dropped.
    NotReady,
    /// Command disabled by the active profile.
    Disabled,
    /// Encoding failed (oversized text).
    Rejected(Error),
    /// Sink refused the frame.
    SinkFull,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

pub struct Dispatcher {
    profile: DriverProfile,
}

impl Dispatcher {
    pub const fn new(profile: DriverProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &DriverProfile {
        &self.profile
    }

    pub fn dispatch<S: FrameSink>(
        &self,
        link: &Supervisor,
        trigger: &Trigger,
        sink: &mut S,
    ) -> DispatchOutcome {
        self.dispatch_command(link, &trigger.command(), sink)
    }

    pub fn dispatch_command<S: FrameSink>(
        &self,
        link: &Supervisor,
        command: &Command<'_>,
        sink: &mut S,
    ) -> DispatchOutcome {
        if !self.profile.commands.allows(command) {
            return DispatchOutcome::Disabled;
        }
        self.send_unfiltered(link, command, sink)
    }

    /// Initialization command, sent once after discovery. Bypasses the
    /// command set: the profile chose it explicitly.
    pub fn greet<S: FrameSink>(&self, link: &Supervisor, sink: &mut S) -> Option<DispatchOutcome> {
        let greeting = self.profile.greeting?;
        Some(self.send_unfiltered(link, &greeting, sink))
    }

    /// Periodic poll command, if the profile has one.
    pub fn poll<S: FrameSink>(&self, link: &Supervisor, sink: &mut S) -> Option<DispatchOutcome> {
        let poll = self.profile.poll?;
        Some(self.send_unfiltered(link, &poll, sink))
    }

    fn send_unfiltered<S: FrameSink>(
        &self,
        link: &Supervisor,
        command: &Command<'_>,
        sink: &mut S,
    ) -> DispatchOutcome {
        let session = match link.require_ready() {
            Ok(session) => session,
            Err(_) => return DispatchOutcome::NotReady,
        };
        let (handle, write) = (session.handle, session.endpoints.write);
        match command.encode() {
            Ok(frame) if sink.send(handle, write, &frame) => DispatchOutcome::Sent,
            Ok(_) => DispatchOutcome::SinkFull,
            Err(e) => DispatchOutcome::Rejected(e),
        }
    }
}
