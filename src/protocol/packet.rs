//! Typed binary packet IO. The writer is an append-only sink, the reader
//! pulls single bytes from a [`ByteSource`] under a declared
//! remaining-length budget so the dispatch loop can verify that a handler
//! consumed exactly its payload.

use byteorder::{BigEndian, ByteOrder};
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError};
use crate::protocol::varint;

/// Hard upper bound on a string's declared maximum, in code points.
pub const MAX_STRING_CODE_POINTS: usize = 32767;

/// A world position packed into one u64 on the wire:
/// bits 38..64 = x (26 bits), bits 12..38 = z (26 bits), bits 0..12 = y
/// (12 bits), all sign-extended on unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn pack(self) -> u64 {
        ((self.x as u64 & 0x3ff_ffff) << 38)
            | ((self.z as u64 & 0x3ff_ffff) << 12)
            | (self.y as u64 & 0xfff)
    }

    pub fn unpack(value: u64) -> Self {
        // Arithmetic shifts on i64 sign-extend each field.
        Self {
            x: ((value as i64) >> 38) as i32,
            z: (((value as i64) << 26) >> 38) as i32,
            y: (((value as i64) << 52) >> 52) as i32,
        }
    }
}

/// Single-byte pull source feeding a [`PacketReader`].
pub trait ByteSource {
    fn next_byte(&mut self) -> Result<u8, DecodeError>;
}

/// Source over a borrowed byte slice; the framing loop drains one packet
/// worth of bytes out of the transport and reads it through this.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.pos).ok_or(DecodeError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(byte)
    }
}

/// Append-only packet body sink.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Booleans are exactly one byte, 0x00 or 0x01.
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(if value { 0x01 } else { 0x00 });
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.write_bytes(&buf);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.write_bytes(&buf);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, value);
        self.write_bytes(&buf);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn write_varint(&mut self, value: i32) {
        varint::write_varint(value, |b| self.buffer.push(b));
    }

    pub fn write_varlong(&mut self, value: i64) {
        varint::write_varlong(value, |b| self.buffer.push(b));
    }

    /// VarInt byte length + UTF-8 bytes. The byte length may not exceed
    /// four bytes per allowed code point; counting bytes instead of code
    /// points over-admits some strings but never rejects a legal one.
    pub fn write_string(&mut self, value: &str, max_code_points: usize) -> Result<(), EncodeError> {
        debug_assert!(max_code_points <= MAX_STRING_CODE_POINTS);
        if value.len() > max_code_points * 4 {
            return Err(EncodeError::StringTooLong {
                length: value.len(),
                max_code_points,
            });
        }
        self.write_varint(value.len() as i32);
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Namespaced identifier, e.g. "minecraft:brand".
    pub fn write_identifier(&mut self, value: &str) -> Result<(), EncodeError> {
        self.write_string(value, MAX_STRING_CODE_POINTS)
    }

    /// UUID as two big-endian u64 halves.
    pub fn write_uuid(&mut self, value: Uuid) {
        let (hi, lo) = value.as_u64_pair();
        self.write_u64(hi);
        self.write_u64(lo);
    }

    pub fn write_position(&mut self, value: Position) {
        self.write_u64(value.pack());
    }
}

/// Pull-based reader scoped to exactly one packet body. Every primitive
/// read decrements the budget; reading past it is a decode error.
pub struct PacketReader<'a> {
    source: &'a mut dyn ByteSource,
    remaining: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(source: &'a mut dyn ByteSource, length: usize) -> Self {
        Self {
            source,
            remaining: length,
        }
    }

    /// Undecoded bytes left in the current packet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Scoped reader over the next `length` bytes of this packet; used for
    /// embedded byte-counted regions like chunk section data.
    pub fn sub_reader(&mut self, length: usize) -> PacketReader<'_> {
        PacketReader::new(self, length)
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        if self.remaining == 0 {
            return Err(DecodeError::UnexpectedEnd);
        }
        self.remaining -= 1;
        self.source.next_byte()
    }

    /// Skips `n` bytes without materializing them.
    pub fn discard(&mut self, n: usize) -> Result<(), DecodeError> {
        for _ in 0..n {
            self.read_byte()?;
        }
        Ok(())
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_byte()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.read_byte()
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_byte()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let buf = self.read_array::<2>()?;
        Ok(BigEndian::read_u16(&buf))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let buf = self.read_array::<4>()?;
        Ok(BigEndian::read_u32(&buf))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let buf = self.read_array::<8>()?;
        Ok(BigEndian::read_u64(&buf))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_varint(&mut self) -> Result<i32, DecodeError> {
        varint::read_varint(|| self.read_byte())
    }

    pub fn read_varlong(&mut self) -> Result<i64, DecodeError> {
        varint::read_varlong(|| self.read_byte())
    }

    pub fn read_byte_array(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        let mut data = Vec::with_capacity(n);
        for _ in 0..n {
            data.push(self.read_byte()?);
        }
        Ok(data)
    }

    /// `length` raw bytes decoded as UTF-8 without a length prefix.
    pub fn read_char_array(&mut self, length: usize) -> Result<String, DecodeError> {
        let bytes = self.read_byte_array(length)?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// VarInt byte length + UTF-8 bytes, bounded by the caller's maximum
    /// code point count.
    pub fn read_string(&mut self, max_code_points: usize) -> Result<String, DecodeError> {
        debug_assert!(max_code_points <= MAX_STRING_CODE_POINTS);
        let length = self.read_varint()?;
        if length < 0 {
            return Err(DecodeError::NegativeStringLength(length));
        }
        let length = length as usize;
        if length > max_code_points * 4 {
            return Err(DecodeError::StringTooLong {
                length,
                max_code_points,
            });
        }
        self.read_char_array(length)
    }

    pub fn read_identifier(&mut self) -> Result<String, DecodeError> {
        self.read_string(MAX_STRING_CODE_POINTS)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, DecodeError> {
        let hi = self.read_u64()?;
        let lo = self.read_u64()?;
        Ok(Uuid::from_u64_pair(hi, lo))
    }

    pub fn read_position(&mut self) -> Result<Position, DecodeError> {
        Ok(Position::unpack(self.read_u64()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(buf)
    }
}

impl ByteSource for PacketReader<'_> {
    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        self.read_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_fixed_width_round_trip() {
        let mut w = PacketWriter::new();
        w.write_bool(true);
        w.write_u8(0xab);
        w.write_i8(-5);
        w.write_u16(0xbeef);
        w.write_i16(-1234);
        w.write_u32(0xdeadbeef);
        w.write_i32(-123456789);
        w.write_u64(0x0123456789abcdef);
        w.write_i64(i64::MIN);
        w.write_f32(3.5);
        w.write_f64(-0.125);

        let bytes = w.into_inner();
        let len = bytes.len();
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, len);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_u8().unwrap(), 0xab);
        assert_eq!(r.read_i8().unwrap(), -5);
        assert_eq!(r.read_u16().unwrap(), 0xbeef);
        assert_eq!(r.read_i16().unwrap(), -1234);
        assert_eq!(r.read_u32().unwrap(), 0xdeadbeef);
        assert_eq!(r.read_i32().unwrap(), -123456789);
        assert_eq!(r.read_u64().unwrap(), 0x0123456789abcdef);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert_eq!(r.read_f32().unwrap(), 3.5);
        assert_eq!(r.read_f64().unwrap(), -0.125);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_bool_rejects_other_bytes() {
        let bytes = [0x02];
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, 1);
        assert_matches!(r.read_bool(), Err(DecodeError::InvalidBool(0x02)));
    }

    #[test]
    fn test_string_known_encoding() {
        let mut w = PacketWriter::new();
        w.write_string("hello", 16).unwrap();
        assert_eq!(w.as_slice(), b"\x05hello");
    }

    #[test]
    fn test_string_round_trip() {
        for s in ["", "Hello, World!", "\u{1f980}"] {
            let mut w = PacketWriter::new();
            w.write_string(s, 32).unwrap();
            let bytes = w.into_inner();
            let len = bytes.len();
            let mut source = SliceSource::new(&bytes);
            let mut r = PacketReader::new(&mut source, len);
            assert_eq!(r.read_string(32).unwrap(), s);
        }
    }

    #[test]
    fn test_string_write_over_bound() {
        let mut w = PacketWriter::new();
        let long = "a".repeat(65);
        assert_matches!(
            w.write_string(&long, 16),
            Err(EncodeError::StringTooLong { .. })
        );
    }

    #[test]
    fn test_string_read_over_bound() {
        let mut w = PacketWriter::new();
        w.write_varint(100);
        let mut bytes = w.into_inner();
        bytes.extend_from_slice(&[b'a'; 100]);
        let len = bytes.len();
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, len);
        assert_matches!(r.read_string(16), Err(DecodeError::StringTooLong { .. }));
    }

    #[test]
    fn test_string_read_negative_length() {
        let mut w = PacketWriter::new();
        w.write_varint(-1);
        let bytes = w.into_inner();
        let len = bytes.len();
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, len);
        assert_matches!(r.read_string(16), Err(DecodeError::NegativeStringLength(-1)));
    }

    #[test]
    fn test_uuid_round_trip() {
        let uuid = Uuid::new_v3(&Uuid::NAMESPACE_DNS, b"OfflinePlayer:tester");
        let mut w = PacketWriter::new();
        w.write_uuid(uuid);
        assert_eq!(w.len(), 16);
        let bytes = w.into_inner();
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, 16);
        assert_eq!(r.read_uuid().unwrap(), uuid);
    }

    #[test]
    fn test_position_round_trip_boundaries() {
        let cases = [
            Position::new(0, 0, 0),
            Position::new(-1, -1, -1),
            Position::new(33554431, 2047, 33554431),
            Position::new(-33554432, -2048, -33554432),
            Position::new(18357644, 831, -20882616),
        ];
        for pos in cases {
            assert_eq!(Position::unpack(pos.pack()), pos);
        }
    }

    #[test]
    fn test_position_sign_extension() {
        // x = -1 occupies all 26 bits of its field; unpack must not produce
        // a large positive number.
        let packed = Position::new(-1, 0, 0).pack();
        assert_eq!(packed >> 38, 0x3ff_ffff);
        assert_eq!(Position::unpack(packed).x, -1);
    }

    #[test]
    fn test_reader_budget_exhaustion() {
        let bytes = [1, 2, 3, 4];
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, 2);
        assert_eq!(r.read_byte().unwrap(), 1);
        assert_eq!(r.read_byte().unwrap(), 2);
        assert_matches!(r.read_byte(), Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn test_discard_counts_against_budget() {
        let bytes = [0u8; 8];
        let mut source = SliceSource::new(&bytes);
        let mut r = PacketReader::new(&mut source, 8);
        r.discard(5).unwrap();
        assert_eq!(r.remaining(), 3);
        assert_matches!(r.discard(4), Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn test_sub_reader_scoping() {
        let bytes = [1, 2, 3, 4, 5];
        let mut source = SliceSource::new(&bytes);
        let mut outer = PacketReader::new(&mut source, 5);
        {
            let mut inner = outer.sub_reader(3);
            assert_eq!(inner.read_byte().unwrap(), 1);
            assert_eq!(inner.remaining(), 2);
            inner.discard(2).unwrap();
            assert_matches!(inner.read_byte(), Err(DecodeError::UnexpectedEnd));
        }
        // Inner consumption came out of the outer budget.
        assert_eq!(outer.remaining(), 2);
        assert_eq!(outer.read_byte().unwrap(), 4);
    }
}
