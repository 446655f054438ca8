//! Link supervisor - owns the lifecycle of the single peripheral link.
//!
//! ```text
//!   Idle ──accept──▶ Connecting ──connected──▶ Connected ──▶ Discovering
//!    ▲                   │                                      │   │
//!    │             connect failed                          ok   │   │ fatal
//!    │                   │                                      ▼   ▼
//!    └───────────────────┴────────── disconnected ◀──── Ready  Disconnected
//! ```
//!
//! Sans-IO: each input returns the action the radio glue must take next.
//! The supervisor never logs and never touches the radio itself, so the
//! whole lifecycle can be driven from host tests.
//!
//! Endpoint handles live inside `LinkState::Ready`; leaving `Ready` drops
//! them, so no stale handle can outlive its connection.

use crate::ble::filter::{should_connect, PeripheralIdentity};
use crate::ble::types::{
    Address, AdvertisementReport, ConnHandle, DiscoveredEndpoints, RadioEvent,
};
use crate::error::Error;
use crate::protocol::{decode_with, Decoders, TelemetryEvent};

/// A discovered, ready-to-use link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralSession {
    pub handle: ConnHandle,
    pub endpoints: DiscoveredEndpoints,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Scanning, no link.
    Idle,
    /// Connect request issued for `address`.
    Connecting { address: Address },
    /// Link up, discovery not started yet.
    Connected(ConnHandle),
    /// Discovery in flight.
    Discovering(ConnHandle),
    /// Discovery succeeded; commands may be sent.
    Ready(PeripheralSession),
    /// Fatal discovery failure, waiting for the disconnect to land.
    Disconnected(ConnHandle),
}

/// Answer to an advertising report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanAction {
    /// Not the target (or busy) - resume scanning.
    Resume,
    /// Stop scanning and connect to this address.
    Connect(Address),
}

/// What the radio glue must do after a lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Nothing to do.
    None,
    /// Run service discovery on this link.
    Discover(ConnHandle),
    /// Link is usable; send the greeting if one is configured.
    Ready(ConnHandle),
    /// Tear the link down.
    Disconnect(ConnHandle),
    /// Go back to scanning.
    RestartScan,
}

pub struct Supervisor {
    identity: PeripheralIdentity,
    state: LinkState,
}

impl Supervisor {
    pub const fn new(identity: PeripheralIdentity) -> Self {
        Self {
            identity,
            state: LinkState::Idle,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// `true` only while the link is `Ready`.
    pub fn is_alive(&self) -> bool {
        matches!(self.state, LinkState::Ready(_))
    }

    pub fn session(&self) -> Option<PeripheralSession> {
        match self.state {
            LinkState::Ready(session) => Some(session),
            _ => None,
        }
    }

    /// Connection and write-characteristic handle, when ready.
    pub fn write_target(&self) -> Option<(ConnHandle, u16)> {
        self.session().map(|s| (s.handle, s.endpoints.write))
    }

    /// The ready session, or `NotReady`. Every outgoing command is gated
    /// on this.
    pub fn require_ready(&self) -> Result<PeripheralSession, Error> {
        self.session().ok_or(Error::NotReady)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Scanning
    // ═══════════════════════════════════════════════════════════════════

    /// Inspect one advertising report. Only an `Idle` supervisor connects;
    /// at most one connect request is ever outstanding.
    pub fn on_advertisement(&mut self, report: &AdvertisementReport<'_>) -> ScanAction {
        if self.state != LinkState::Idle || !should_connect(&self.identity, report) {
            return ScanAction::Resume;
        }
        self.state = LinkState::Connecting {
            address: report.address,
        };
        ScanAction::Connect(report.address)
    }

    /// Connect request timed out or was refused.
    pub fn on_connect_failed(&mut self) -> Action {
        match self.state {
            LinkState::Connecting { .. } => {
                self.state = LinkState::Idle;
                Action::RestartScan
            }
            _ => Action::None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Connection lifecycle
    // ═══════════════════════════════════════════════════════════════════

    pub fn on_connected(&mut self, handle: ConnHandle) -> Action {
        match self.state {
            LinkState::Idle | LinkState::Connecting { .. } => {
                self.state = LinkState::Connected(handle);
                Action::Discover(handle)
            }
            // A second link while one is active is not ours to keep.
            _ => Action::Disconnect(handle),
        }
    }

    /// Mark discovery as started. Returns `false` if it must not run
    /// (wrong handle, or already started for this connection).
    pub fn begin_discovery(&mut self, handle: ConnHandle) -> bool {
        match self.state {
            LinkState::Connected(h) if h == handle => {
                self.state = LinkState::Discovering(handle);
                true
            }
            _ => false,
        }
    }

    /// Feed the discovery result back in.
    pub fn on_discovery_complete(
        &mut self,
        handle: ConnHandle,
        result: Result<DiscoveredEndpoints, Error>,
    ) -> Action {
        if self.state != LinkState::Discovering(handle) {
            return Action::None;
        }
        match result {
            Ok(endpoints) => {
                self.state = LinkState::Ready(PeripheralSession { handle, endpoints });
                Action::Ready(handle)
            }
            Err(_) => {
                self.state = LinkState::Disconnected(handle);
                Action::Disconnect(handle)
            }
        }
    }

    /// Link dropped, for any reason. Events for a handle other than the
    /// current one are stale and ignored.
    pub fn on_disconnected(&mut self, handle: ConnHandle, _reason: u8) -> Action {
        match self.current_handle() {
            Some(h) if h == handle => {
                self.state = LinkState::Idle;
                Action::RestartScan
            }
            _ => Action::None,
        }
    }

    /// Decode a notification arriving on the current link's notify
    /// characteristic. Anything else is dropped.
    pub fn on_notification(
        &self,
        handle: ConnHandle,
        value_handle: u16,
        data: &[u8],
        decoders: Decoders,
    ) -> Option<TelemetryEvent> {
        let session = self.session()?;
        if session.handle != handle || session.endpoints.notify != value_handle {
            return None;
        }
        Some(decode_with(data, decoders))
    }

    fn current_handle(&self) -> Option<ConnHandle> {
        match self.state {
            LinkState::Idle | LinkState::Connecting { .. } => None,
            LinkState::Connected(h) | LinkState::Discovering(h) | LinkState::Disconnected(h) => {
                Some(h)
            }
            LinkState::Ready(session) => Some(session.handle),
        }
    }
}

/// Result of routing one `RadioEvent` through the supervisor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Scan(ScanAction),
    Link(Action),
    Telemetry(Option<TelemetryEvent>),
}

impl Supervisor {
    /// Single entry point for radio events, in delivery order.
    pub fn handle(&mut self, event: RadioEvent<'_>, decoders: Decoders) -> Outcome {
        match event {
            RadioEvent::Advertisement(report) => Outcome::Scan(self.on_advertisement(&report)),
            RadioEvent::Connected(handle) => Outcome::Link(self.on_connected(handle)),
            RadioEvent::ConnectFailed => Outcome::Link(self.on_connect_failed()),
            RadioEvent::Disconnected { handle, reason } => {
                Outcome::Link(self.on_disconnected(handle, reason))
            }
            RadioEvent::Notification {
                handle,
                value_handle,
                data,
            } => Outcome::Telemetry(self.on_notification(handle, value_handle, data, decoders)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::types::Endpoint;

    const NAME_AD: [u8; 9] = [0x08, 0x09, b'C', b'1', b' ', b'P', b'l', b'u', b's'];
    const ENDPOINTS: DiscoveredEndpoints = DiscoveredEndpoints {
        notify: 0x0B,
        write: 0x0E,
        notify_enabled: true,
    };

    fn report(data: &[u8]) -> AdvertisementReport<'_> {
        AdvertisementReport {
            address: [1, 2, 3, 4, 5, 6],
            rssi: -50,
            connectable: true,
            directed: false,
            data,
        }
    }

    fn ready(handle: ConnHandle) -> Supervisor {
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        assert_eq!(
            sup.on_advertisement(&report(&NAME_AD)),
            ScanAction::Connect([1, 2, 3, 4, 5, 6])
        );
        assert_eq!(sup.on_connected(handle), Action::Discover(handle));
        assert!(sup.begin_discovery(handle));
        assert_eq!(
            sup.on_discovery_complete(handle, Ok(ENDPOINTS)),
            Action::Ready(handle)
        );
        sup
    }

    #[test]
    fn only_idle_supervisor_connects() {
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        assert!(matches!(
            sup.on_advertisement(&report(&NAME_AD)),
            ScanAction::Connect(_)
        ));
        // Second report while the connect is outstanding
        assert_eq!(sup.on_advertisement(&report(&NAME_AD)), ScanAction::Resume);
    }

    #[test]
    fn connect_failure_returns_to_scanning() {
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        sup.on_advertisement(&report(&NAME_AD));
        assert_eq!(sup.on_connect_failed(), Action::RestartScan);
        assert_eq!(sup.state(), LinkState::Idle);
    }

    #[test]
    fn discovery_runs_once_per_connection() {
        let h = ConnHandle(3);
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        sup.on_connected(h);
        assert!(!sup.begin_discovery(ConnHandle(4)));
        assert!(sup.begin_discovery(h));
        assert!(!sup.begin_discovery(h));
    }

    #[test]
    fn write_target_only_when_ready() {
        let h = ConnHandle(1);
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        assert_eq!(sup.write_target(), None);
        assert_eq!(sup.require_ready(), Err(Error::NotReady));
        sup.on_connected(h);
        assert_eq!(sup.write_target(), None);

        let sup = ready(h);
        assert_eq!(sup.write_target(), Some((h, 0x0E)));
    }

    #[test]
    fn fatal_discovery_disconnects_then_idles() {
        let h = ConnHandle(2);
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        sup.on_connected(h);
        sup.begin_discovery(h);
        let action =
            sup.on_discovery_complete(h, Err(Error::CharacteristicNotFound(Endpoint::Write)));
        assert_eq!(action, Action::Disconnect(h));
        assert!(!sup.is_alive());
        assert_eq!(sup.on_disconnected(h, 0x16), Action::RestartScan);
        assert_eq!(sup.state(), LinkState::Idle);
    }

    #[test]
    fn stale_disconnect_is_ignored() {
        let h = ConnHandle(5);
        let mut sup = ready(h);
        assert_eq!(sup.on_disconnected(ConnHandle(9), 0x13), Action::None);
        assert!(sup.is_alive());
        assert_eq!(sup.on_disconnected(h, 0x13), Action::RestartScan);
        assert!(!sup.is_alive());
        assert_eq!(sup.session(), None);
    }

    #[test]
    fn notifications_filtered_by_handle_and_characteristic() {
        let h = ConnHandle(7);
        let sup = ready(h);
        let hr = [0xAB, 0x00, 0x07, 0xFF, 0x31, 0x0A, 0x01, 0x4B];
        assert_eq!(
            sup.on_notification(h, 0x0B, &hr, Decoders::ALL),
            Some(TelemetryEvent::HeartRate { bpm: 0x4B })
        );
        assert_eq!(sup.on_notification(h, 0x0E, &hr, Decoders::ALL), None);
        assert_eq!(sup.on_notification(ConnHandle(8), 0x0B, &hr, Decoders::ALL), None);
    }

    #[test]
    fn second_connection_is_refused() {
        let h = ConnHandle(1);
        let mut sup = ready(h);
        assert_eq!(sup.on_connected(ConnHandle(2)), Action::Disconnect(ConnHandle(2)));
        assert!(sup.is_alive());
    }

    #[test]
    fn radio_events_route_through_handle() {
        let mut sup = Supervisor::new(PeripheralIdentity::by_name(b"C1 Plus"));
        let out = sup.handle(
            RadioEvent::Advertisement(report(&NAME_AD)),
            Decoders::ALL,
        );
        assert_eq!(out, Outcome::Scan(ScanAction::Connect([1, 2, 3, 4, 5, 6])));
        let out = sup.handle(RadioEvent::ConnectFailed, Decoders::ALL);
        assert_eq!(out, Outcome::Link(Action::RestartScan));
    }
}
