//! Console byte-stream parser.
//!
//! Each input byte is read exactly once and matched against the command
//! set:
//!
//! | Byte        | Trigger                          |
//! |-------------|----------------------------------|
//! | `T`         | ring vibrate                     |
//! | `B`         | battery request                  |
//! | `H`         | heart-rate request               |
//! | `S` / `G`   | blood-pressure request           |
//! | `M<text>⏎`  | push `<text>` to the band        |
//!
//! Anything else is ignored. Text ends at `\n` or `\r`; an empty line
//! produces nothing, and a line that is not UTF-8 is rejected.

use crate::config::{MAX_FRAME_LEN, MAX_TEXT_LEN};
use crate::dispatch::Trigger;
use crate::error::Error;
use crate::protocol::command::TEXT_PREFIX;
use crate::protocol::frame::HEADER_LEN;
use heapless::{String, Vec};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleEvent {
    Trigger(Trigger),
    /// Input that can never become a frame.
    Rejected(Error),
}

enum Mode {
    Command,
    Text { len: usize },
}

pub struct ConsoleParser {
    mode: Mode,
    text: Vec<u8, MAX_TEXT_LEN>,
}

impl Default for ConsoleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleParser {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Command,
            text: Vec::new(),
        }
    }

    /// `true` while collecting the body of an `M` command.
    pub fn in_text(&self) -> bool {
        matches!(self.mode, Mode::Text { .. })
    }

    pub fn feed(&mut self, byte: u8) -> Option<ConsoleEvent> {
        match self.mode {
            Mode::Command => self.command(byte),
            Mode::Text { len } => self.text_byte(byte, len),
        }
    }

    /// Feed a whole buffer, handing each event to `on_event`.
    pub fn feed_all(&mut self, bytes: &[u8], mut on_event: impl FnMut(ConsoleEvent)) {
        for &b in bytes {
            if let Some(event) = self.feed(b) {
                on_event(event);
            }
        }
    }

    fn command(&mut self, byte: u8) -> Option<ConsoleEvent> {
        let trigger = match byte {
            b'T' => Trigger::RingVibrate,
            b'B' => Trigger::Battery,
            b'H' => Trigger::HeartRate,
            b'S' | b'G' => Trigger::BloodPressure,
            b'M' => {
                self.text.clear();
                self.mode = Mode::Text { len: 0 };
                return None;
            }
            _ => return None,
        };
        Some(ConsoleEvent::Trigger(trigger))
    }

    fn text_byte(&mut self, byte: u8, len: usize) -> Option<ConsoleEvent> {
        if byte != b'\n' && byte != b'\r' {
            // Past capacity we only count, so the error reports the real size.
            let _ = self.text.push(byte);
            self.mode = Mode::Text { len: len + 1 };
            return None;
        }

        self.mode = Mode::Command;
        if len == 0 {
            return None;
        }
        if len > MAX_TEXT_LEN {
            return Some(ConsoleEvent::Rejected(Error::FrameTooLarge {
                len: HEADER_LEN + 1 + TEXT_PREFIX.len() + len,
                max: MAX_FRAME_LEN,
            }));
        }

        let Ok(text) = core::str::from_utf8(&self.text) else {
            return Some(ConsoleEvent::Rejected(Error::InvalidText));
        };
        let mut owned = String::new();
        // Same capacity as `self.text`.
        let _ = owned.push_str(text);
        Some(ConsoleEvent::Trigger(Trigger::Text(owned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8]) -> std::vec::Vec<ConsoleEvent> {
        let mut parser = ConsoleParser::new();
        let mut out = std::vec::Vec::new();
        parser.feed_all(input, |e| out.push(e));
        out
    }

    #[test]
    fn each_byte_is_matched_once() {
        let events = collect(b"TBHSG");
        assert_eq!(
            events,
            [
                ConsoleEvent::Trigger(Trigger::RingVibrate),
                ConsoleEvent::Trigger(Trigger::Battery),
                ConsoleEvent::Trigger(Trigger::HeartRate),
                ConsoleEvent::Trigger(Trigger::BloodPressure),
                ConsoleEvent::Trigger(Trigger::BloodPressure),
            ]
        );
    }

    #[test]
    fn unknown_bytes_and_whitespace_ignored() {
        assert!(collect(b"xF \r\n?").is_empty());
    }

    #[test]
    fn text_collected_until_newline() {
        let events = collect(b"MHello\nT");
        let ConsoleEvent::Trigger(Trigger::Text(text)) = &events[0] else {
            panic!("expected text, got {:?}", events[0]);
        };
        assert_eq!(text.as_str(), "Hello");
        // Command letters inside the text are not triggers
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ConsoleEvent::Trigger(Trigger::RingVibrate));
    }

    #[test]
    fn empty_text_line_is_dropped() {
        assert!(collect(b"M\r").is_empty());
    }

    #[test]
    fn over_capacity_text_is_rejected_with_real_size() {
        let mut input = std::vec::Vec::from(&b"M"[..]);
        input.extend(std::iter::repeat(b'a').take(MAX_TEXT_LEN + 6));
        input.push(b'\n');
        let events = collect(&input);
        assert_eq!(
            events,
            [ConsoleEvent::Rejected(Error::FrameTooLarge {
                len: 8 + MAX_TEXT_LEN + 6,
                max: MAX_FRAME_LEN,
            })]
        );
    }

    #[test]
    fn invalid_utf8_text_is_rejected() {
        let mut parser = ConsoleParser::new();
        for &b in b"M\xFF\xFE" {
            assert_eq!(parser.feed(b), None);
        }
        assert!(parser.in_text());
        assert_eq!(
            parser.feed(b'\n'),
            Some(ConsoleEvent::Rejected(Error::InvalidText))
        );
        assert!(!parser.in_text());
        // Back in command mode
        assert_eq!(parser.feed(b'T'), Some(ConsoleEvent::Trigger(Trigger::RingVibrate)));
    }
}
