//! Text lines written back to the console.

use crate::dispatch::DispatchOutcome;
use crate::protocol::TelemetryEvent;
use core::fmt::Write;
use heapless::String;

/// Longest rendered line: "Unknown: " plus 20 bytes as `XX-`.
pub const LINE_LEN: usize = 80;

pub type Line = String<LINE_LEN>;

/// One line per decoded notification, newline-terminated.
pub fn telemetry_line(event: &TelemetryEvent) -> Line {
    let mut line = Line::new();
    let _ = match event {
        TelemetryEvent::HeartRate { bpm } => writeln!(line, "Heart rate: {} bpm", bpm),
        TelemetryEvent::Battery { percent } => writeln!(line, "Battery: {}%", percent),
        TelemetryEvent::Unknown { raw } => {
            let _ = line.push_str("Unknown: ");
            let _ = write_hex_list(&mut line, raw);
            line.push('\n').map_err(|_| core::fmt::Error)
        }
    };
    line
}

/// Console feedback for a send that did not go out. `None` on success.
pub fn outcome_line(outcome: &DispatchOutcome) -> Option<Line> {
    let mut line = Line::new();
    let _ = match outcome {
        DispatchOutcome::Sent => return None,
        DispatchOutcome::NotReady => writeln!(line, "Band not connected"),
        DispatchOutcome::Disabled => writeln!(line, "Command disabled"),
        DispatchOutcome::Rejected(e) => writeln!(line, "Rejected: {:?}", e),
        DispatchOutcome::SinkFull => writeln!(line, "Write queue full"),
    };
    Some(line)
}

/// `AB-00-07-` style hex list.
pub fn write_hex_list<W: Write>(out: &mut W, bytes: &[u8]) -> core::fmt::Result {
    for b in bytes {
        write!(out, "{:02X}-", b)?;
    }
    Ok(())
}
