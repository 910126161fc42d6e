//! Canonical LEB128 varints.
//!
//! Seven value bits per byte, least significant group first, high bit set
//! on every byte except the last. A `u64` needs at most ten bytes.
//!
//! Decoding is strict: an encoding is rejected if it is longer than the
//! minimal one (a trailing `0x00` group) or if it does not fit in 64 bits.
//! Two different byte strings must never decode to the same integer, or the
//! hash of a re-encoded value would differ from the hash of what the peer
//! sent.

use super::CodecError;

/// Longest valid encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Append the varint encoding of `value` to `out`.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes `write_varint` would emit for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode a varint from the front of `data`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_varint(data: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT_LEN) {
        let group = u64::from(byte & 0x7f);
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(CodecError::malformed("varint overflows u64"));
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(CodecError::malformed("non-canonical varint"));
            }
            return Ok((value, i + 1));
        }
    }
    if data.len() >= MAX_VARINT_LEN {
        Err(CodecError::malformed("varint overflows u64"))
    } else {
        Err(CodecError::malformed("truncated varint"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, v);
        out
    }

    #[test]
    fn known_encodings() {
        assert_eq!(enc(0), vec![0x00]);
        assert_eq!(enc(1), vec![0x01]);
        assert_eq!(enc(127), vec![0x7f]);
        assert_eq!(enc(128), vec![0x80, 0x01]);
        assert_eq!(enc(300), vec![0xac, 0x02]);
        assert_eq!(enc(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn varint_len_matches_encoding() {
        for v in [0, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            assert_eq!(varint_len(v), enc(v).len(), "value {v}");
        }
    }

    #[test]
    fn decode_reports_consumed_bytes() {
        let (v, n) = read_varint(&[0xac, 0x02, 0xff]).unwrap();
        assert_eq!(v, 300);
        assert_eq!(n, 2);
    }

    #[test]
    fn max_value_decodes() {
        let bytes = enc(u64::MAX);
        assert_eq!(read_varint(&bytes).unwrap(), (u64::MAX, MAX_VARINT_LEN));
    }

    #[test]
    fn overlong_rejected() {
        // 1 encoded with a redundant zero continuation group.
        assert!(read_varint(&[0x81, 0x00]).is_err());
        assert!(read_varint(&[0x80, 0x80, 0x00]).is_err());
    }

    #[test]
    fn overflow_rejected() {
        let mut bytes = vec![0xff; 9];
        bytes.push(0x02);
        assert!(read_varint(&bytes).is_err());

        let eleven = vec![0x80; 11];
        assert!(read_varint(&eleven).is_err());
    }

    #[test]
    fn truncated_rejected() {
        assert!(read_varint(&[]).is_err());
        assert!(read_varint(&[0x80]).is_err());
        assert!(read_varint(&[0xff, 0xff]).is_err());
    }
}
