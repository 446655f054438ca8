//! Serial console over USB.
//!
//! The receive side turns typed bytes into triggers and pushes them
//! through the Ready-gated dispatcher. The transmit side writes decoded
//! telemetry and dispatch feedback back to the host as text lines.

pub mod parser;
pub mod render;

use crate::ble::central::{dispatch_shared, SharedSupervisor, TelemetryQueue, WriteQueue};
use crate::config::USB_CDC_PACKET_SIZE;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::usb::serial::{ConsoleRx, ConsoleTx};
use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_usb::driver::EndpointError;
use parser::{ConsoleEvent, ConsoleParser};
use render::Line;

/// Feedback lines for the host, produced by the receive side.
pub type FeedbackQueue = Channel<CriticalSectionRawMutex, Line, 4>;

const PACKET: usize = USB_CDC_PACKET_SIZE as usize;

/// Read console bytes forever, one byte matched at a time.
pub async fn rx_loop(
    mut rx: ConsoleRx,
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
    writes: &WriteQueue,
    feedback: &FeedbackQueue,
) -> ! {
    let mut buf = [0u8; PACKET];
    loop {
        rx.wait_connection().await;
        info!("console attached");
        // A half-typed text line does not survive a reconnect.
        let mut parser = ConsoleParser::new();

        loop {
            let n = match rx.read_packet(&mut buf).await {
                Ok(n) => n,
                Err(EndpointError::Disabled) => break,
                Err(EndpointError::BufferOverflow) => {
                    warn!("console packet too large");
                    continue;
                }
            };
            parser.feed_all(&buf[..n], |event| {
                on_event(event, link, dispatcher, writes, feedback)
            });
        }
        info!("console detached");
    }
}

fn on_event(
    event: ConsoleEvent,
    link: &SharedSupervisor,
    dispatcher: &Dispatcher,
    writes: &WriteQueue,
    feedback: &FeedbackQueue,
) {
    let outcome = match event {
        ConsoleEvent::Trigger(trigger) => {
            let outcome = dispatch_shared(link, dispatcher, &trigger, writes);
            match outcome {
                DispatchOutcome::Sent => debug!("console: {} queued", trigger),
                DispatchOutcome::NotReady => info!("console: {} dropped, band not ready", trigger),
                other => warn!("console: {} not sent: {}", trigger, other),
            }
            outcome
        }
        ConsoleEvent::Rejected(e) => {
            warn!("console: input rejected: {}", e);
            DispatchOutcome::Rejected(e)
        }
    };
    if let Some(line) = render::outcome_line(&outcome) {
        let _ = feedback.try_send(line);
    }
}

/// Write telemetry and feedback lines to the host.
pub async fn tx_loop(
    mut tx: ConsoleTx,
    telemetry: &TelemetryQueue,
    feedback: &FeedbackQueue,
) -> ! {
    loop {
        tx.wait_connection().await;
        loop {
            let line = match select(telemetry.receive(), feedback.receive()).await {
                Either::First(event) => render::telemetry_line(&event),
                Either::Second(line) => line,
            };
            if write_line(&mut tx, line.as_bytes()).await.is_err() {
                // Host went away; lines are dropped until it returns.
                break;
            }
        }
    }
}

async fn write_line(tx: &mut ConsoleTx, bytes: &[u8]) -> Result<(), EndpointError> {
    for chunk in bytes.chunks(PACKET) {
        tx.write_packet(chunk).await?;
    }
    // A full last packet needs a ZLP to end the transfer.
    if bytes.len() % PACKET == 0 {
        tx.write_packet(&[]).await?;
    }
    Ok(())
}
