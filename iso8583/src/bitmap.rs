//! Bitmap encoding and decoding.
//!
//! The bitmap sits immediately after the MTI and flags which of fields
//! 1..128 are present. Bit numbering is big-endian within each byte and
//! across bytes: bit 1 is the most significant bit of byte 0. Bit 1
//! itself flags the presence of a second 8-byte bitmap covering fields
//! 65..128.

use std::collections::BTreeSet;

use crate::error::Error;

pub const PRIMARY_LEN: usize = 8;
pub const FULL_LEN: usize = 16;

/// Decode the bitmap at the start of `data`.
///
/// Returns the set of present data elements (bit 1 excluded, it is
/// structural) and the number of bytes consumed (8 or 16).
pub fn decode(data: &[u8]) -> Result<(BTreeSet<u32>, usize), Error> {
    if data.len() < PRIMARY_LEN {
        return Err(Error::Bitmap(format!(
            "need {PRIMARY_LEN} bytes for the primary bitmap, have {}",
            data.len()
        )));
    }
    let secondary = data[0] & 0x80 != 0;
    let len = if secondary { FULL_LEN } else { PRIMARY_LEN };
    if data.len() < len {
        return Err(Error::Bitmap(format!(
            "secondary bitmap flagged but only {} of {len} bytes present",
            data.len()
        )));
    }

    let mut present = BTreeSet::new();
    for bit in 2..=(len * 8) as u32 {
        let index = (bit - 1) as usize;
        if data[index / 8] & (0x80 >> (index % 8)) != 0 {
            present.insert(bit);
        }
    }
    Ok((present, len))
}

/// Encode the minimal bitmap for a set of present data elements.
///
/// Emits 8 bytes unless the set reaches into fields 65..128, in which
/// case 16 bytes are emitted with bit 1 set.
pub fn encode(present: &BTreeSet<u32>) -> Vec<u8> {
    let secondary = present.iter().any(|&bit| bit > 64);
    let len = if secondary { FULL_LEN } else { PRIMARY_LEN };
    let mut bytes = vec![0u8; len];
    if secondary {
        bytes[0] |= 0x80;
    }
    for &bit in present {
        if bit < 2 || bit > (len * 8) as u32 {
            continue;
        }
        let index = (bit - 1) as usize;
        bytes[index / 8] |= 0x80 >> (index % 8);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(bits: &[u32]) -> BTreeSet<u32> {
        bits.iter().copied().collect()
    }

    #[test]
    fn test_primary_only() {
        let bytes = encode(&set(&[2]));
        assert_eq!(bytes, vec![0x40, 0, 0, 0, 0, 0, 0, 0]);
        let (present, consumed) = decode(&bytes).unwrap();
        assert_eq!(present, set(&[2]));
        assert_eq!(consumed, PRIMARY_LEN);
    }

    #[test]
    fn test_secondary() {
        let bytes = encode(&set(&[2, 70]));
        assert_eq!(bytes.len(), FULL_LEN);
        assert_eq!(bytes[0], 0xC0);
        let (present, consumed) = decode(&bytes).unwrap();
        assert_eq!(present, set(&[2, 70]));
        assert_eq!(consumed, FULL_LEN);
    }

    #[test]
    fn test_empty_set() {
        let bytes = encode(&BTreeSet::new());
        assert_eq!(bytes, vec![0; 8]);
        let (present, _) = decode(&bytes).unwrap();
        assert!(present.is_empty());
    }

    #[test]
    fn test_known_pattern_round_trip() {
        let bitmap: Vec<u8> = vec![
            0xF0, 0x10, 0x05, 0x42, 0x84, 0x61, 0x80, 0x02, 0x02, 0x00, 0x00, 0x04, 0x00, 0x00,
            0x00, 0x00,
        ];
        let (present, consumed) = decode(&bitmap).unwrap();
        assert_eq!(consumed, FULL_LEN);
        assert_eq!(
            present,
            set(&[2, 3, 4, 12, 22, 24, 26, 31, 33, 38, 42, 43, 48, 49, 63, 71, 94])
        );
        assert_eq!(encode(&present), bitmap);
    }

    #[test]
    fn test_truncated_secondary() {
        let mut bytes = encode(&set(&[2, 70]));
        bytes.truncate(12);
        assert!(decode(&bytes).is_err());
    }
}
