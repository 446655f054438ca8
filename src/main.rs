//! wearfit-central - BLE central for Wearfit wristbands on nRF52840.
//!
//! Tasks:
//!
//! - `softdevice_task` - SoftDevice event pump; forwards USB power events.
//! - `central_task`    - scan → connect → discover → serve, forever.
//! - `usb_task`        - USB device stack.
//! - `console_task`    - console bytes → Ready-gated dispatch.
//! - `telemetry_task`  - decoded telemetry and feedback → console lines.
//! - `poll_task`       - periodic poll command through the same gate.

#![no_std]
#![no_main]

mod ble;
mod config;
mod console;
mod dispatch;
mod error;
mod protocol;
mod usb;

use core::cell::RefCell;
use core::mem;

use ble::central::{self, SharedSupervisor, TelemetryQueue, WriteQueue};
use ble::supervisor::Supervisor;
use config::ACTIVE_PROFILE;
use console::FeedbackQueue;
use defmt::{debug, info, unwrap, warn};
use dispatch::{DispatchOutcome, Dispatcher};
use embassy_executor::Spawner;
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker};
use nrf_softdevice::{raw, SocEvent, Softdevice};
use static_cell::StaticCell;
use usb::serial::{ConsoleRx, ConsoleTx, UsbDriver};

use {defmt_rtt as _, panic_probe as _};

// ═══════════════════════════════════════════════════════════════════════════
// Shared state
// ═══════════════════════════════════════════════════════════════════════════

static SUPERVISOR: SharedSupervisor =
    Mutex::new(RefCell::new(Supervisor::new(ACTIVE_PROFILE.target)));
static DISPATCHER: Dispatcher = Dispatcher::new(ACTIVE_PROFILE);

/// Console/poll → central: frames for the write characteristic.
static WRITE_QUEUE: WriteQueue = Channel::new();
/// Central → console: decoded notifications.
static TELEMETRY: TelemetryQueue = Channel::new();
/// Console rx → console tx: feedback for sends that did not go out.
static FEEDBACK: FeedbackQueue = Channel::new();

static VBUS: StaticCell<SoftwareVbusDetect> = StaticCell::new();

// ═══════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice, vbus: &'static SoftwareVbusDetect) -> ! {
    sd.run_with_callback(|event: SocEvent| match event {
        SocEvent::PowerUsbRemoved => vbus.detected(false),
        SocEvent::PowerUsbDetected => vbus.detected(true),
        SocEvent::PowerUsbPowerReady => vbus.ready(),
        _ => {}
    })
    .await
}

#[embassy_executor::task]
async fn central_task(sd: &'static Softdevice) -> ! {
    central::run(sd, &SUPERVISOR, &DISPATCHER, &WRITE_QUEUE, &TELEMETRY).await
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    usb::serial::run_usb_device(device).await
}

#[embassy_executor::task]
async fn console_task(rx: ConsoleRx) -> ! {
    console::rx_loop(rx, &SUPERVISOR, &DISPATCHER, &WRITE_QUEUE, &FEEDBACK).await
}

#[embassy_executor::task]
async fn telemetry_task(tx: ConsoleTx) -> ! {
    console::tx_loop(tx, &TELEMETRY, &FEEDBACK).await
}

#[embassy_executor::task]
async fn poll_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(config::TELEMETRY_POLL_MS));
    loop {
        ticker.next().await;
        match central::poll_shared(&SUPERVISOR, &DISPATCHER, &WRITE_QUEUE) {
            None | Some(DispatchOutcome::NotReady) => {}
            Some(DispatchOutcome::Sent) => debug!("poll queued"),
            Some(other) => warn!("poll not sent: {}", other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("wearfit-central starting");

    // SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::USBD.set_priority(Priority::P2);

    let sd: &'static Softdevice = Softdevice::enable(&softdevice_config());
    let vbus: &'static SoftwareVbusDetect = VBUS.init(usb_power_detect());

    let usb = usb::serial::init(p.USBD, vbus);

    unwrap!(spawner.spawn(softdevice_task(sd, vbus)));
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(console_task(usb.rx)));
    unwrap!(spawner.spawn(telemetry_task(usb.tx)));
    unwrap!(spawner.spawn(central_task(sd)));
    unwrap!(spawner.spawn(poll_task()));

    info!(
        "profile: greeting {}, poll {}, decoders {}",
        ACTIVE_PROFILE.greeting,
        ACTIVE_PROFILE.poll,
        ACTIVE_PROFILE.decoders
    );
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: config::ATT_MTU as u16,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: raw::BLE_GAP_ADV_SET_COUNT_DEFAULT as u8,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::CENTRAL_NAME.as_ptr() as _,
            current_len: config::CENTRAL_NAME.len() as u16,
            max_len: config::CENTRAL_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Enable USB power events and read the current VBUS state. The
/// SoftDevice must already be enabled.
fn usb_power_detect() -> SoftwareVbusDetect {
    let mut status: u32 = 0;
    unsafe {
        raw::sd_power_usbdetected_enable(1);
        raw::sd_power_usbpwrrdy_enable(1);
        raw::sd_power_usbremoved_enable(1);
        raw::sd_power_usbregstatus_get(&mut status);
    }
    // USBREGSTATUS: bit 0 VBUSDETECT, bit 1 OUTPUTRDY
    SoftwareVbusDetect::new(status & 0b01 != 0, status & 0b10 != 0)
}
