//! Vendor service discovery on a freshly connected link.
//!
//! Runs once per connection, strictly in order:
//!
//! 1. Vendor service.                 Missing ⇒ `ServiceNotFound`.
//! 2. Notify characteristic.          Missing ⇒ `CharacteristicNotFound(Notify)`.
//! 3. CCCD write enabling notify.     Refused ⇒ `NotifyEnableFailed`, carry
//!                                    on without telemetry.
//! 4. Write characteristic.           Missing ⇒ `CharacteristicNotFound(Write)`.
//!
//! Nothing is retried here. A fatal error goes back to the link
//! supervisor, which disconnects; the scan/connect loop is the retry.

use crate::ble::types::{DiscoveredEndpoints, Endpoint, Uuid128};
use crate::error::Error;

/// UUIDs of the vendor service and its two characteristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceLayout {
    pub service: Uuid128,
    pub notify: Uuid128,
    pub write: Uuid128,
}

/// GATT client operations on one connection, as provided by the radio
/// stack. Timeouts belong to the implementation; each call just reports
/// success or failure.
#[allow(async_fn_in_trait)]
pub trait GattLink {
    /// Locate the primary service `uuid`. `false` if the peer does not
    /// have it or the link cannot look for it.
    async fn discover_service(&mut self, uuid: &Uuid128) -> bool;

    /// Value handle of characteristic `uuid` inside the discovered service.
    async fn discover_characteristic(&mut self, uuid: &Uuid128) -> Option<u16>;

    /// Turn on notifications for the characteristic at `value_handle`.
    async fn enable_notify(&mut self, value_handle: u16) -> Result<(), Error>;
}

/// Resolve the vendor service on `link`.
pub async fn discover<L: GattLink>(
    link: &mut L,
    layout: &ServiceLayout,
) -> Result<DiscoveredEndpoints, Error> {
    if !link.discover_service(&layout.service).await {
        return Err(Error::ServiceNotFound);
    }

    let notify = link
        .discover_characteristic(&layout.notify)
        .await
        .ok_or(Error::CharacteristicNotFound(Endpoint::Notify))?;

    let notify_enabled = match link.enable_notify(notify).await {
        Ok(()) => true,
        Err(e) if !e.is_fatal() => false,
        Err(e) => return Err(e),
    };

    let write = link
        .discover_characteristic(&layout.write)
        .await
        .ok_or(Error::CharacteristicNotFound(Endpoint::Write))?;

    Ok(DiscoveredEndpoints {
        notify,
        write,
        notify_enabled,
    })
}
