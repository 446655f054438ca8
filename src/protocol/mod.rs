//! Wristband command/response codec.
//!
//! Outgoing commands are encoded into fixed-layout frames written to the
//! write characteristic; notifications from the notify characteristic
//! are decoded into typed telemetry. Responses are matched by opcode
//! only - the protocol carries no request identity.

pub mod command;
pub mod frame;
pub mod telemetry;


pub use command::Command;
pub use frame::{encode, FrameBuf};
pub use telemetry::{decode, decode_with, Decoders, TelemetryEvent};
