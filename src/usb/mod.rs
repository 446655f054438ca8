//! USB Device subsystem - presents a serial console to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb` with a single CDC-ACM function. Bytes typed into the
//! port are console commands; decoded telemetry is written back as text
//! lines.

pub mod serial;
