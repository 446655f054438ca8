//! BLE central task - scan → connect → discover → serve, forever.
//!
//! All link-state decisions are made by the `Supervisor` behind a
//! critical-section mutex; this module only performs the radio calls it
//! asks for and logs the outcome. Discovery runs outside the lock, and
//! its result is applied only if the connection handle still matches.

use core::cell::RefCell;

use crate::ble::discovery::{self, GattLink};
use crate::ble::supervisor::{Action, Outcome, ScanAction, Supervisor};
use crate::ble::types::{AdvertisementReport, ConnHandle, RadioEvent, Uuid128};
use crate::ble::wearfit_client::{Notification, WearfitClient};
use crate::config;
use crate::dispatch::{DispatchOutcome, Dispatcher, FrameSink, Trigger};
use crate::error::{BleError, Error};
use crate::protocol::{FrameBuf, TelemetryEvent};
use defmt::{debug, error, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::Timer;
use nrf_softdevice::ble::gatt_client::Client;
use nrf_softdevice::ble::{central, gatt_client, Address, Connection, Uuid};
use nrf_softdevice::{raw, Softdevice};

/// Link state shared by the central, console and poll tasks.
pub type SharedSupervisor = Mutex<CriticalSectionRawMutex, RefCell<Supervisor>>;

/// A frame queued for the write characteristic of one connection.
pub struct WriteRequest {
    pub handle: ConnHandle,
    pub value_handle: u16,
    pub frame: FrameBuf,
}

pub type WriteQueue = Channel<CriticalSectionRawMutex, WriteRequest, { config::WRITE_QUEUE_DEPTH }>;
pub type TelemetryQueue =
    Channel<CriticalSectionRawMutex, TelemetryEvent, { config::TELEMETRY_QUEUE_DEPTH }>;

/// `FrameSink` over the write queue. Never blocks: a full queue drops.
pub struct QueueSink<'a>(pub &'a WriteQueue);

impl FrameSink for QueueSink<'_> {
    fn send(&mut self, handle: ConnHandle, value_handle: u16, frame: &[u8]) -> bool {
        let Ok(frame) = FrameBuf::from_slice(frame) else {
            return false;
        };
        self.0
            .try_send(WriteRequest {
                handle,
                value_handle,
                frame,
            })
            .is_ok()
    }
}

/// Ready-gated dispatch from any task. The readiness check and the
/// enqueue happen in one critical section.
pub fn dispatch_shared(
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
    trigger: &Trigger,
    writes: &WriteQueue,
) -> DispatchOutcome {
    link.lock(|sup| dispatcher.dispatch(&sup.borrow(), trigger, &mut QueueSink(writes)))
}

/// Periodic poll through the same gate.
pub fn poll_shared(
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
    writes: &WriteQueue,
) -> Option<DispatchOutcome> {
    link.lock(|sup| dispatcher.poll(&sup.borrow(), &mut QueueSink(writes)))
}

fn apply(link: &SharedSupervisor, event: RadioEvent<'_>, dispatcher: &Dispatcher) -> Outcome {
    let decoders = dispatcher.profile().decoders;
    link.lock(|sup| sup.borrow_mut().handle(event, decoders))
}

// ═══════════════════════════════════════════════════════════════════════════
// GATT link over the SoftDevice
// ═══════════════════════════════════════════════════════════════════════════

pub struct SoftdeviceLink<'a> {
    conn: &'a Connection,
    client: Option<WearfitClient>,
}

impl<'a> SoftdeviceLink<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn, client: None }
    }

    /// Discovered client, needed to receive notifications.
    pub fn into_client(self) -> Option<WearfitClient> {
        self.client
    }
}

impl GattLink for SoftdeviceLink<'_> {
    async fn discover_service(&mut self, uuid: &Uuid128) -> bool {
        // The client is built for one service; it cannot look for another.
        if Uuid::new_128(uuid) != WearfitClient::uuid() {
            error!("layout service differs from the GATT client's");
            return false;
        }
        match gatt_client::discover::<WearfitClient>(self.conn).await {
            Ok(client) => {
                self.client = Some(client);
                true
            }
            Err(_) => false,
        }
    }

    async fn discover_characteristic(&mut self, uuid: &Uuid128) -> Option<u16> {
        self.client.as_ref()?.value_handle(&Uuid::new_128(uuid))
    }

    async fn enable_notify(&mut self, value_handle: u16) -> Result<(), Error> {
        let cccd = self
            .client
            .as_ref()
            .and_then(|c| c.cccd_handle(value_handle))
            .ok_or(Error::NotifyEnableFailed)?;
        gatt_client::write(self.conn, cccd, &[0x01, 0x00])
            .await
            .map_err(|_| Error::NotifyEnableFailed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Scan & connect
// ═══════════════════════════════════════════════════════════════════════════

/// Scan until the supervisor accepts a report. Returns the peer to dial.
async fn scan_for_target(
    sd: &Softdevice,
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
) -> Result<raw::ble_gap_addr_t, Error> {
    let scan_config = central::ScanConfig {
        active: config::BLE_SCAN_ACTIVE,
        interval: config::BLE_SCAN_INTERVAL,
        window: config::BLE_SCAN_WINDOW,
        timeout: config::BLE_SCAN_TIMEOUT,
        ..Default::default()
    };

    info!("scanning for band");
    central::scan(sd, &scan_config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };
        let report = AdvertisementReport {
            address: params.peer_addr.addr,
            rssi: params.rssi,
            connectable: params.type_.connectable() != 0,
            directed: params.type_.directed() != 0,
            data,
        };

        match apply(link, RadioEvent::Advertisement(report), dispatcher) {
            Outcome::Scan(ScanAction::Connect(address)) => {
                let name = crate::ble::adv_parser::device_name(data);
                info!(
                    "target found: {} {:02x} (RSSI {})",
                    name.as_str(),
                    address,
                    params.rssi
                );
                Some(params.peer_addr)
            }
            // Returning None resumes scanning.
            _ => None,
        }
    })
    .await
    .map_err(|e| {
        Error::from(match e {
            central::ScanError::Raw(raw) => BleError::Raw(raw as u32),
            _ => BleError::ScanFailed,
        })
    })
}

async fn connect(sd: &Softdevice, peer: &Address) -> Result<Connection, Error> {
    let whitelist = [peer];
    let conn_config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            interval: config::BLE_SCAN_INTERVAL,
            window: config::BLE_SCAN_WINDOW,
            timeout: config::BLE_CONNECT_TIMEOUT,
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };

    central::connect(sd, &conn_config).await.map_err(|e| {
        Error::from(match e {
            central::ConnectError::Raw(raw) => BleError::Raw(raw as u32),
            _ => BleError::ConnectFailed,
        })
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Central task
// ═══════════════════════════════════════════════════════════════════════════

/// Run the link forever. Every failure ends in a rescan.
pub async fn run(
    sd: &'static Softdevice,
    link: &'static SharedSupervisor,
    dispatcher: &'static Dispatcher,
    writes: &'static WriteQueue,
    telemetry: &'static TelemetryQueue,
) -> ! {
    loop {
        let peer = match scan_for_target(sd, link, dispatcher).await {
            Ok(peer) => peer,
            Err(e) => {
                warn!("scan failed: {}", e);
                Timer::after_millis(config::SCAN_RETRY_MS).await;
                continue;
            }
        };

        let conn = match connect(sd, &Address::from_raw(peer)).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("connect failed: {}", e);
                apply(link, RadioEvent::ConnectFailed, dispatcher);
                continue;
            }
        };

        let Some(raw_handle) = conn.handle() else {
            warn!("link dropped before it could be used");
            apply(link, RadioEvent::ConnectFailed, dispatcher);
            continue;
        };
        let handle = ConnHandle(raw_handle);

        let reason = serve(&conn, handle, link, dispatcher, writes, telemetry).await;
        // Dropping the last reference tears the link down if still up.
        drop(conn);

        match apply(link, RadioEvent::Disconnected { handle, reason }, dispatcher) {
            Outcome::Link(Action::RestartScan) => {
                info!("disconnected (reason {=u8:#04x}), rescanning", reason)
            }
            other => debug!("stale disconnect ignored: {}", other),
        }
    }
}

/// Drive one connection until it ends. Returns the disconnect reason.
async fn serve(
    conn: &Connection,
    handle: ConnHandle,
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
    writes: &WriteQueue,
    telemetry: &TelemetryQueue,
) -> u8 {
    const LOCAL: u8 = raw::BLE_HCI_LOCAL_HOST_TERMINATED_CONNECTION as u8;
    const REMOTE: u8 = raw::BLE_HCI_REMOTE_USER_TERMINATED_CONNECTION as u8;

    match apply(link, RadioEvent::Connected(handle), dispatcher) {
        Outcome::Link(Action::Discover(_)) => info!("connected, handle {}", handle),
        _ => {
            warn!("unexpected connection {}, dropping it", handle);
            let _ = conn.disconnect();
            return LOCAL;
        }
    }

    if !link.lock(|sup| sup.borrow_mut().begin_discovery(handle)) {
        return LOCAL;
    }

    let mut gatt = SoftdeviceLink::new(conn);
    let result = discovery::discover(&mut gatt, &dispatcher.profile().layout).await;
    match &result {
        Ok(ep) if !ep.notify_enabled => {
            warn!("{}, continuing without telemetry", Error::NotifyEnableFailed)
        }
        Ok(ep) => info!(
            "discovery done: notify {=u16:#06x}, write {=u16:#06x}",
            ep.notify, ep.write
        ),
        Err(e) => error!("discovery failed: {}", e),
    }

    let applied = link.lock(|sup| sup.borrow_mut().on_discovery_complete(handle, result));
    match applied {
        Action::Ready(_) => {}
        Action::Disconnect(_) => {
            let _ = conn.disconnect();
            return LOCAL;
        }
        _ => return LOCAL,
    }

    let Some(client) = gatt.into_client() else {
        return LOCAL;
    };

    match link.lock(|sup| dispatcher.greet(&sup.borrow(), &mut QueueSink(writes))) {
        Some(DispatchOutcome::Sent) => info!("link ready, greeting queued"),
        Some(other) => warn!("greeting not sent: {}", other),
        None => info!("link ready"),
    }

    let notifications = gatt_client::run(conn, &client, |n: Notification| {
        on_notification(link, dispatcher, telemetry, handle, n)
    });
    let writer = write_loop(conn, handle, link, writes);

    match select(notifications, writer).await {
        Either::First(_) => REMOTE,
        Either::Second(()) => LOCAL,
    }
}

fn on_notification(
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
    telemetry: &TelemetryQueue,
    handle: ConnHandle,
    n: Notification,
) {
    debug!("notify {=u16:#06x}: {=[u8]:02X}", n.value_handle, &n.data[..]);
    let event = RadioEvent::Notification {
        handle,
        value_handle: n.value_handle,
        data: &n.data,
    };
    if let Outcome::Telemetry(Some(event)) = apply(link, event, dispatcher) {
        info!("telemetry: {}", event);
        if telemetry.try_send(event).is_err() {
            warn!("telemetry queue full, dropping event");
        }
    }
}

/// Drain the write queue onto this connection. Returns only when a write
/// finds the link gone.
async fn write_loop(
    conn: &Connection,
    handle: ConnHandle,
    link: &SharedSupervisor,
    writes: &WriteQueue,
) {
    loop {
        let req = writes.receive().await;
        // Frames queued for an earlier connection, or before a disconnect.
        let target = link.lock(|sup| sup.borrow().write_target());
        if target != Some((req.handle, req.value_handle)) || req.handle != handle {
            debug!("dropping stale frame for {}", req.handle);
            continue;
        }
        match gatt_client::write(conn, req.value_handle, &req.frame).await {
            Ok(()) => debug!("wrote {=[u8]:02X}", &req.frame[..]),
            Err(gatt_client::WriteError::Disconnected) => return,
            Err(_) => warn!("write failed: {}", Error::from(BleError::WriteFailed)),
        }
    }
}
