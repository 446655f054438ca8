//! Wearfit command frame layout.
//!
//! ```text
//! Byte 0: Preamble   0xAB
//! Byte 1: Reserved   0x00
//! Byte 2: Length     number of bytes after this one (flags + opcode + params)
//! Byte 3: Flags      0xFF
//! Byte 4: Opcode
//! Byte 5..: Params
//! ```
//!
//! `length == 2 + params.len()` always holds for frames we emit.

use crate::config::MAX_FRAME_LEN;
use crate::error::Error;
use heapless::Vec;

pub const PREAMBLE: u8 = 0xAB;
pub const RESERVED: u8 = 0x00;
pub const FLAGS: u8 = 0xFF;

/// Preamble, reserved, length, flags.
pub const HEADER_LEN: usize = 4;

/// Offset of the opcode byte (in both directions).
pub const OPCODE_OFFSET: usize = 4;

/// An encoded frame, sized to the transport's maximum write.
pub type FrameBuf = Vec<u8, MAX_FRAME_LEN>;

/// Encode `opcode` + `params` into a frame.
pub fn encode(opcode: u8, params: &[u8]) -> Result<FrameBuf, Error> {
    encode_parts(opcode, &[params])
}

/// Encode a frame whose params are the concatenation of `parts`.
///
/// Fails with `FrameTooLarge` instead of truncating.
pub fn encode_parts(opcode: u8, parts: &[&[u8]]) -> Result<FrameBuf, Error> {
    let params_len: usize = parts.iter().map(|p| p.len()).sum();
    let total = HEADER_LEN + 1 + params_len;
    if total > MAX_FRAME_LEN || 2 + params_len > u8::MAX as usize {
        return Err(Error::FrameTooLarge {
            len: total,
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = FrameBuf::new();
    let length = (2 + params_len) as u8;
    // Capacity checked above; these cannot fail.
    let _ = frame.extend_from_slice(&[PREAMBLE, RESERVED, length, FLAGS, opcode]);
    for part in parts {
        let _ = frame.extend_from_slice(part);
    }
    Ok(frame)
}
