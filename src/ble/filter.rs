//! Advertisement filter - decides whether a scan report identifies the
//! target wristband.
//!
//! Policy, in order:
//!
//! 1. Allowlist configured ⇒ the address alone decides: accept if it is
//!    listed, reject otherwise. The payload is never inspected.
//! 2. No target name configured ⇒ reject.
//! 3. No Complete Local Name record ⇒ inconclusive, keep scanning.
//! 4. Name bytes equal to the target, length included ⇒ accept,
//!    otherwise reject.
//!
//! Addresses are compared as raw bytes in radio order.

use crate::ble::adv_parser::complete_local_name;
use crate::ble::types::{AdvertisementReport, Address};

/// What the central is looking for. Configured once, immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralIdentity {
    /// Peer addresses accepted outright. Empty = no allowlist.
    pub addresses: &'static [Address],
    /// Exact Complete Local Name to match. Only consulted without an
    /// allowlist.
    pub name: Option<&'static [u8]>,
}

impl PeripheralIdentity {
    /// Match by advertised name only.
    pub const fn by_name(name: &'static [u8]) -> Self {
        Self {
            addresses: &[],
            name: Some(name),
        }
    }

    /// Match by address allowlist only.
    pub const fn by_addresses(addresses: &'static [Address]) -> Self {
        Self {
            addresses,
            name: None,
        }
    }

    pub fn allows_address(&self, address: &Address) -> bool {
        self.addresses.iter().any(|a| a == address)
    }
}

/// Outcome of inspecting one advertising report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Report identifies the target - connect.
    Accept,
    /// Report identifies some other device.
    Reject,
    /// Report carries no name record to judge by.
    Inconclusive,
}

/// Apply the filter policy to `report`.
pub fn evaluate(identity: &PeripheralIdentity, report: &AdvertisementReport<'_>) -> Verdict {
    if !identity.addresses.is_empty() {
        return if identity.allows_address(&report.address) {
            Verdict::Accept
        } else {
            Verdict::Reject
        };
    }

    let Some(target) = identity.name else {
        return Verdict::Reject;
    };

    match complete_local_name(report.data) {
        Some(name) if name == target => Verdict::Accept,
        Some(_) => Verdict::Reject,
        None => Verdict::Inconclusive,
    }
}

/// `true` when the report should trigger a connect request.
///
/// On `false` the caller must resume scanning: the SoftDevice pauses
/// report delivery until it gets an answer.
pub fn should_connect(identity: &PeripheralIdentity, report: &AdvertisementReport<'_>) -> bool {
    evaluate(identity, report) == Verdict::Accept
}
