use heapless::String;

/// AD type: Shortened Local Name.
pub const AD_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;
/// AD type: Complete Local Name.
pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// Iterator over `(ad_type, payload)` pairs of raw advertisement data.
///
/// Stops at the first zero-length or overrunning structure.
pub struct AdStructures<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        if i >= self.data.len() {
            return None;
        }
        let len = self.data[i] as usize;
        if len == 0 || i + len >= self.data.len() {
            self.pos = self.data.len();
            return None;
        }
        self.pos = i + len + 1;
        Some((self.data[i + 1], &self.data[i + 2..i + 1 + len]))
    }
}

/// Walk the AD structures in `data`.
pub fn ad_structures(data: &[u8]) -> AdStructures<'_> {
    AdStructures { data, pos: 0 }
}

/// Payload of the first AD structure of type `ad_type`, if any.
pub fn find_record(data: &[u8], ad_type: u8) -> Option<&[u8]> {
    ad_structures(data).find_map(|(t, payload)| (t == ad_type).then_some(payload))
}

/// Raw bytes of the Complete Local Name record.
pub fn complete_local_name(data: &[u8]) -> Option<&[u8]> {
    find_record(data, AD_TYPE_COMPLETE_LOCAL_NAME)
}

/// Extract complete/shortened local name from advertisement data, for logs.
pub fn device_name(data: &[u8]) -> String<32> {
    let found = ad_structures(data).find_map(|(t, payload)| {
        (t == AD_TYPE_COMPLETE_LOCAL_NAME || t == AD_TYPE_SHORT_LOCAL_NAME).then_some(payload)
    });

    let mut name = String::new();
    match found {
        Some(bytes) => {
            for &b in bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
        }
        None => {
            let _ = name.push_str("Unknown");
        }
    }
    name
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_complete_local_name_after_flags() {
        let ad_data = [
            0x02, 0x01, 0x06, // Flags: LE General Discoverable
            0x08, 0x09, b'C', b'1', b' ', b'P', b'l', b'u', b's',
        ];
        assert_eq!(complete_local_name(&ad_data), Some(&b"C1 Plus"[..]));
    }

    #[test]
    fn shortened_name_is_not_a_complete_name() {
        let ad_data = [0x03, 0x08, b'C', b'1'];
        assert_eq!(complete_local_name(&ad_data), None);
        assert_eq!(device_name(&ad_data).as_str(), "C1");
    }

    #[test]
    fn zero_length_structure_ends_parsing() {
        let ad_data = [0x00, 0x08, 0x09, b'C', b'1', b' ', b'P', b'l', b'u', b's'];
        assert_eq!(complete_local_name(&ad_data), None);
    }

    #[test]
    fn overrunning_structure_is_ignored() {
        // len=9 claims more bytes than are present
        let ad_data = [0x09, 0x09, b'C', b'1'];
        assert_eq!(complete_local_name(&ad_data), None);
        assert_eq!(ad_structures(&ad_data).count(), 0);
    }

    #[test]
    fn empty_advertisement_data() {
        assert_eq!(ad_structures(&[]).count(), 0);
        assert_eq!(device_name(&[]).as_str(), "Unknown");
    }

    #[test]
    fn name_truncated_to_32_chars() {
        let mut ad_data = [0u8; 40];
        ad_data[0] = 35; // len
        ad_data[1] = AD_TYPE_COMPLETE_LOCAL_NAME;
        for b in ad_data.iter_mut().take(37).skip(2) {
            *b = b'X';
        }
        assert_eq!(device_name(&ad_data).len(), 32);
    }
}
