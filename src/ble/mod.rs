//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Central** role
//! against a single Wearfit band:
//!
//! 1. **Filter** - decides from each advertising report whether it is
//!    the configured band.
//! 2. **Supervisor** - owns the link state machine and the discovered
//!    endpoints; every other task asks it before touching the link.
//! 3. **Discovery** - resolves the vendor service and its notify/write
//!    characteristics once per connection.
//! 4. **Central** - the task that performs the radio calls the
//!    supervisor asks for.
//!
//! Communication with other tasks is done via Embassy channels defined
//! in the crate root.

pub mod adv_parser;
pub mod central;
pub mod discovery;
pub mod filter;
pub mod supervisor;
pub mod types;
pub mod wearfit_client;

pub use types::*;
