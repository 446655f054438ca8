//! Host-testable library interface for wearfit-central.
//!
//! Re-exports the pure logic (advertisement filter, link supervisor,
//! service discovery, command codec, dispatcher, console parser) so it
//! can be tested on the host without the nRF52840.
//!
//! Usage: `cargo test`
//!
//! Note: The firmware uses main.rs with #![no_std] and #![no_main] and
//! compiles the same source files as part of its own module tree.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;

// Internal module paths for the pure parts of `ble` and `console`; their
// `mod.rs` files pull in the SoftDevice and USB glue.
#[path = "ble/adv_parser.rs"]
mod ble_adv_parser_impl;
#[path = "ble/discovery.rs"]
mod ble_discovery_impl;
#[path = "ble/filter.rs"]
mod ble_filter_impl;
#[path = "ble/supervisor.rs"]
mod ble_supervisor_impl;
#[path = "ble/types.rs"]
mod ble_types_impl;

#[path = "console/parser.rs"]
mod console_parser_impl;
#[path = "console/render.rs"]
mod console_render_impl;

pub mod ble {
    pub mod adv_parser {
        pub use crate::ble_adv_parser_impl::*;
    }
    pub mod discovery {
        pub use crate::ble_discovery_impl::*;
    }
    pub mod filter {
        pub use crate::ble_filter_impl::*;
    }
    pub mod supervisor {
        pub use crate::ble_supervisor_impl::*;
    }
    pub mod types {
        pub use crate::ble_types_impl::*;
    }

    pub use types::*;
}

pub mod console {
    pub mod parser {
        pub use crate::console_parser_impl::*;
    }
    pub mod render {
        pub use crate::console_render_impl::*;
    }

    pub use parser::{ConsoleEvent, ConsoleParser};
}

pub use error::{BleError, Error};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - cross-module behaviour
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::ble::discovery::{discover, GattLink, ServiceLayout};
    use super::ble::filter::{evaluate, should_connect, PeripheralIdentity, Verdict};
    use super::ble::supervisor::{Action, LinkState, ScanAction, Supervisor};
    use super::ble::types::*;
    use super::config::{self, DriverProfile};
    use super::console::{ConsoleEvent, ConsoleParser};
    use super::dispatch::{DispatchOutcome, Dispatcher, FrameSink, Trigger};
    use super::error::{BleError, Error};
    use super::protocol::{Decoders, FrameBuf, TelemetryEvent};
    use embassy_futures::block_on;

    // ════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════

    fn name_ad(name: &[u8]) -> std::vec::Vec<u8> {
        let mut ad = std::vec![0x02, 0x01, 0x06, name.len() as u8 + 1, 0x09];
        ad.extend_from_slice(name);
        ad
    }

    fn report(address: Address, data: &[u8]) -> AdvertisementReport<'_> {
        AdvertisementReport {
            address,
            rssi: -55,
            connectable: true,
            directed: false,
            data,
        }
    }

    /// GATT link backed by a table of characteristic UUIDs.
    struct TableLink {
        handle: ConnHandle,
        service_present: bool,
        characteristics: std::vec::Vec<(Uuid128, u16)>,
        cccd_ok: bool,
    }

    impl TableLink {
        fn wearfit(handle: ConnHandle) -> Self {
            Self {
                handle,
                service_present: true,
                characteristics: std::vec![
                    (config::WEARFIT_NOTIFY_UUID, 0x000B),
                    (config::WEARFIT_WRITE_UUID, 0x000E),
                ],
                cccd_ok: true,
            }
        }
    }

    impl GattLink for TableLink {
        async fn discover_service(&mut self, uuid: &Uuid128) -> bool {
            self.service_present && *uuid == config::WEARFIT_SERVICE_UUID
        }

        async fn discover_characteristic(&mut self, uuid: &Uuid128) -> Option<u16> {
            self.characteristics
                .iter()
                .find(|(u, _)| u == uuid)
                .map(|&(_, h)| h)
        }

        async fn enable_notify(&mut self, _value_handle: u16) -> Result<(), Error> {
            if self.cccd_ok {
                Ok(())
            } else {
                Err(Error::NotifyEnableFailed)
            }
        }
    }

    #[derive(Default)]
    struct Frames(std::vec::Vec<FrameBuf>);

    impl FrameSink for Frames {
        fn send(&mut self, _handle: ConnHandle, _value_handle: u16, frame: &[u8]) -> bool {
            self.0.push(FrameBuf::from_slice(frame).unwrap());
            true
        }
    }

    /// Drive a supervisor from scan to the end of discovery on `link`.
    /// The band advertises the target name from an allowlisted address,
    /// so either profile accepts it.
    fn connect_and_discover(sup: &mut Supervisor, link: &mut TableLink, layout: &ServiceLayout) -> Action {
        let data = name_ad(config::TARGET_LOCAL_NAME);
        assert!(matches!(
            sup.on_advertisement(&report(config::TARGET_ADDRESSES[0], &data)),
            ScanAction::Connect(_)
        ));
        let handle = link.handle;
        assert_eq!(sup.on_connected(handle), Action::Discover(handle));
        assert!(sup.begin_discovery(handle));
        let result = block_on(discover(link, layout));
        sup.on_discovery_complete(handle, result)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Advertisement filter
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn name_prefix_never_matches() {
        let identity = PeripheralIdentity::by_name(b"C1 Plus");
        for name in [&b"C1"[..], b"C1 Plu", b"C1 Plus2", b"c1 plus"] {
            let data = name_ad(name);
            assert_eq!(evaluate(&identity, &report([0; 6], &data)), Verdict::Reject);
        }
        let data = name_ad(b"C1 Plus");
        assert!(should_connect(&identity, &report([0; 6], &data)));
    }

    #[test]
    fn allowlisted_address_ignores_wrong_name() {
        let identity = DriverProfile::telemetry().target;
        let data = name_ad(b"Something else");
        assert!(should_connect(
            &identity,
            &report(config::TARGET_ADDRESSES[0], &data)
        ));
    }

    #[test]
    fn telemetry_profile_rejects_unlisted_band_with_target_name() {
        let identity = DriverProfile::telemetry().target;
        let data = name_ad(config::TARGET_LOCAL_NAME);
        assert!(!should_connect(&identity, &report([0xDE; 6], &data)));
        assert_eq!(evaluate(&identity, &report([0xDE; 6], &data)), Verdict::Reject);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Supervisor + discovery
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn full_discovery_reaches_ready() {
        let mut sup = Supervisor::new(DriverProfile::vibration().target);
        let mut link = TableLink::wearfit(ConnHandle(4));
        let action = connect_and_discover(&mut sup, &mut link, &config::WEARFIT_LAYOUT);
        assert_eq!(action, Action::Ready(ConnHandle(4)));
        assert!(sup.is_alive());
        let session = sup.session().unwrap();
        assert_eq!(session.endpoints.notify, 0x000B);
        assert_eq!(session.endpoints.write, 0x000E);
        assert!(session.endpoints.notify_enabled);
    }

    #[test]
    fn missing_write_characteristic_never_reaches_ready() {
        let mut sup = Supervisor::new(DriverProfile::vibration().target);
        let mut link = TableLink::wearfit(ConnHandle(4));
        link.characteristics.retain(|(u, _)| *u != config::WEARFIT_WRITE_UUID);
        let action = connect_and_discover(&mut sup, &mut link, &config::WEARFIT_LAYOUT);
        assert_eq!(action, Action::Disconnect(ConnHandle(4)));
        assert!(!sup.is_alive());
        assert_eq!(sup.on_disconnected(ConnHandle(4), 0x16), Action::RestartScan);
        assert_eq!(sup.state(), LinkState::Idle);
        assert_eq!(sup.session(), None);
    }

    #[test]
    fn cccd_refusal_degrades_but_stays_ready() {
        let mut sup = Supervisor::new(DriverProfile::vibration().target);
        let mut link = TableLink::wearfit(ConnHandle(1));
        link.cccd_ok = false;
        let action = connect_and_discover(&mut sup, &mut link, &config::WEARFIT_LAYOUT);
        assert_eq!(action, Action::Ready(ConnHandle(1)));
        assert!(!sup.session().unwrap().endpoints.notify_enabled);
    }

    #[test]
    fn disconnect_during_discovery_drops_late_result() {
        let mut sup = Supervisor::new(DriverProfile::vibration().target);
        let h = ConnHandle(2);
        let data = name_ad(config::TARGET_LOCAL_NAME);
        sup.on_advertisement(&report([1; 6], &data));
        sup.on_connected(h);
        assert!(sup.begin_discovery(h));
        assert_eq!(sup.on_disconnected(h, 0x08), Action::RestartScan);

        let mut link = TableLink::wearfit(h);
        let result = block_on(discover(&mut link, &config::WEARFIT_LAYOUT));
        assert_eq!(sup.on_discovery_complete(h, result), Action::None);
        assert_eq!(sup.state(), LinkState::Idle);
    }

    #[test]
    fn wrong_layout_is_service_not_found() {
        let mut link = TableLink::wearfit(ConnHandle(1));
        let layout = ServiceLayout {
            service: [0; 16],
            ..config::WEARFIT_LAYOUT
        };
        assert_eq!(
            block_on(discover(&mut link, &layout)),
            Err(Error::ServiceNotFound)
        );
        assert!(Error::ServiceNotFound.is_fatal());
        assert!(!Error::NotifyEnableFailed.is_fatal());
    }

    #[test]
    fn presets_use_the_service_the_gatt_client_is_built_for() {
        for profile in [DriverProfile::vibration(), DriverProfile::telemetry()] {
            assert_eq!(profile.layout.service, config::ACTIVE_PROFILE.layout.service);
        }
    }

    #[test]
    fn radio_failures_wrap_into_error_and_never_end_the_link() {
        for e in [BleError::ScanFailed, BleError::ConnectFailed, BleError::Raw(0x0D)] {
            let err: Error = e.into();
            assert_eq!(err, Error::Ble(e));
            assert!(!err.is_fatal());
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Console → dispatcher
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn console_bytes_become_frames_when_ready() {
        let mut sup = Supervisor::new(DriverProfile::telemetry().target);
        let mut link = TableLink::wearfit(ConnHandle(1));
        connect_and_discover(&mut sup, &mut link, &config::WEARFIT_LAYOUT);

        let dispatcher = Dispatcher::new(DriverProfile::telemetry());
        let mut parser = ConsoleParser::new();
        let mut sink = Frames::default();
        parser.feed_all(b"TMHi\n", |event| {
            if let ConsoleEvent::Trigger(trigger) = event {
                assert!(dispatcher.dispatch(&sup, &trigger, &mut sink).is_sent());
            }
        });

        assert_eq!(&sink.0[0][..], &[0xAB, 0x00, 0x04, 0xFF, 0xB1, 0x80, 0x01]);
        assert_eq!(
            &sink.0[1][..],
            &[0xAB, 0x00, 0x07, 0xFF, 0x72, 0x80, 0x03, 0x02, b'H', b'i']
        );
    }

    #[test]
    fn console_commands_dropped_while_scanning() {
        let sup = Supervisor::new(DriverProfile::telemetry().target);
        let dispatcher = Dispatcher::new(DriverProfile::telemetry());
        let mut sink = Frames::default();
        assert_eq!(
            dispatcher.dispatch(&sup, &Trigger::Battery, &mut sink),
            DispatchOutcome::NotReady
        );
        assert!(sink.0.is_empty());
    }

    #[test]
    fn vibration_profile_ignores_telemetry() {
        let mut sup = Supervisor::new(DriverProfile::vibration().target);
        let mut link = TableLink::wearfit(ConnHandle(1));
        connect_and_discover(&mut sup, &mut link, &config::WEARFIT_LAYOUT);
        let hr = [0xAB, 0x00, 0x04, 0xFF, 0x31, 0x0A, 0x48];
        let event = sup.on_notification(ConnHandle(1), 0x000B, &hr, DriverProfile::vibration().decoders);
        assert!(matches!(event, Some(TelemetryEvent::Unknown { .. })));
        let event = sup.on_notification(ConnHandle(1), 0x000B, &hr, Decoders::ALL);
        assert_eq!(event, Some(TelemetryEvent::HeartRate { bpm: 0x48 }));
    }
}
