//! LEB128-style variable-length integer codec. Seven value bits per byte,
//! high bit set while more bytes follow. Signed values are reinterpreted
//! as their unsigned bit pattern, so negative numbers always occupy the
//! maximum length; there is no zig-zag step.

use crate::error::DecodeError;

const SEGMENT_BITS: u8 = 0x7f;
const CONTINUE_BIT: u8 = 0x80;

/// A VarInt is at most 5 bytes (ceil(32 / 7)).
pub const MAX_VARINT_BYTES: usize = 5;
/// A VarLong is at most 10 bytes (ceil(64 / 7)).
pub const MAX_VARLONG_BYTES: usize = 10;

macro_rules! varnum_codec {
    ($write:ident, $read:ident, $signed:ty, $unsigned:ty, $bits:expr, $max_bytes:expr) => {
        pub fn $write(value: $signed, mut sink: impl FnMut(u8)) {
            let mut value = value as $unsigned;
            loop {
                let byte = (value as u8) & SEGMENT_BITS;
                value >>= 7;
                if value == 0 {
                    sink(byte);
                    return;
                }
                sink(byte | CONTINUE_BIT);
            }
        }

        pub fn $read(
            mut source: impl FnMut() -> Result<u8, DecodeError>,
        ) -> Result<$signed, DecodeError> {
            let mut value: $unsigned = 0;
            let mut offset = 0;
            loop {
                if offset >= $bits {
                    return Err(DecodeError::UnterminatedVarInt {
                        max_bytes: $max_bytes,
                    });
                }
                let byte = source()?;
                value |= ((byte & SEGMENT_BITS) as $unsigned) << offset;
                if byte & CONTINUE_BIT == 0 {
                    return Ok(value as $signed);
                }
                offset += 7;
            }
        }
    };
}

varnum_codec!(write_varint, read_varint, i32, u32, 32, MAX_VARINT_BYTES);
varnum_codec!(write_varlong, read_varlong, i64, u64, 64, MAX_VARLONG_BYTES);

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn encode_varint(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(value, |b| out.push(b));
        out
    }

    fn encode_varlong(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varlong(value, |b| out.push(b));
        out
    }

    fn decode_varint(bytes: &[u8]) -> Result<i32, DecodeError> {
        let mut iter = bytes.iter().copied();
        read_varint(|| iter.next().ok_or(DecodeError::UnexpectedEnd))
    }

    fn decode_varlong(bytes: &[u8]) -> Result<i64, DecodeError> {
        let mut iter = bytes.iter().copied();
        read_varlong(|| iter.next().ok_or(DecodeError::UnexpectedEnd))
    }

    #[test]
    fn test_varint_known_encodings() {
        assert_eq!(encode_varint(0), [0x00]);
        assert_eq!(encode_varint(1), [0x01]);
        assert_eq!(encode_varint(127), [0x7f]);
        assert_eq!(encode_varint(128), [0x80, 0x01]);
        assert_eq!(encode_varint(300), [0xac, 0x02]);
        assert_eq!(encode_varint(2097151), [0xff, 0xff, 0x7f]);
        // Negative values carry the full unsigned bit pattern.
        assert_eq!(encode_varint(-1), [0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(encode_varint(i32::MIN), [0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn test_varint_round_trip() {
        for value in [0, 1, -1, 127, 128, 300, 25565, i32::MAX, i32::MIN] {
            assert_eq!(decode_varint(&encode_varint(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_varlong_round_trip() {
        for value in [0i64, 1, -1, 1 << 35, i64::MAX, i64::MIN] {
            assert_eq!(decode_varlong(&encode_varlong(value)).unwrap(), value);
        }
        assert_eq!(encode_varlong(-1).len(), MAX_VARLONG_BYTES);
    }

    #[test]
    fn test_non_terminating_varint() {
        let bytes = [0x80u8; 6];
        assert_matches!(
            decode_varint(&bytes),
            Err(DecodeError::UnterminatedVarInt { max_bytes: 5 })
        );
        let bytes = [0x80u8; 11];
        assert_matches!(
            decode_varlong(&bytes),
            Err(DecodeError::UnterminatedVarInt { max_bytes: 10 })
        );
    }

    #[test]
    fn test_truncated_input() {
        assert_matches!(decode_varint(&[0x80]), Err(DecodeError::UnexpectedEnd));
    }
}
