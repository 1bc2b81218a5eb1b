//! Recursive NBT decoder over a [`PacketReader`]. Packets embed an
//! uncompressed, named root tag; the tree is owned by whichever handler
//! parsed it.
//!
//! Byte/Int/Long-array payloads are not implemented in this milestone and
//! fail loudly instead of silently desynchronizing the stream.

use std::collections::HashMap;

use crate::error::DecodeError;
use crate::protocol::packet::PacketReader;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(HashMap<String, Tag>),
}

impl Tag {
    /// Reads a named root tag. TAG_End as the root is malformed.
    pub fn read_root(reader: &mut PacketReader<'_>) -> Result<(String, Tag), DecodeError> {
        Tag::read_optional_root(reader)?.ok_or(DecodeError::UnexpectedNbtEnd)
    }

    /// Reads a named root tag where a bare TAG_End byte stands for
    /// "no data", as in block entity payloads.
    pub fn read_optional_root(
        reader: &mut PacketReader<'_>,
    ) -> Result<Option<(String, Tag)>, DecodeError> {
        let type_id = reader.read_u8()?;
        if type_id == TAG_END {
            return Ok(None);
        }
        let name = read_name(reader)?;
        let tag = Tag::read_payload(reader, type_id)?;
        Ok(Some((name, tag)))
    }

    fn read_payload(reader: &mut PacketReader<'_>, type_id: u8) -> Result<Tag, DecodeError> {
        match type_id {
            TAG_BYTE => Ok(Tag::Byte(reader.read_i8()?)),
            TAG_SHORT => Ok(Tag::Short(reader.read_i16()?)),
            TAG_INT => Ok(Tag::Int(reader.read_i32()?)),
            TAG_LONG => Ok(Tag::Long(reader.read_i64()?)),
            TAG_FLOAT => Ok(Tag::Float(reader.read_f32()?)),
            TAG_DOUBLE => Ok(Tag::Double(reader.read_f64()?)),
            TAG_STRING => {
                let length = reader.read_u16()?;
                Ok(Tag::String(reader.read_char_array(length as usize)?))
            }
            TAG_LIST => {
                // Elements share one declared type and omit their own
                // type/name prefixes.
                let element_type = reader.read_u8()?;
                let length = reader.read_i32()?;
                let mut list = Vec::new();
                if length > 0 {
                    list.reserve(length as usize);
                    for _ in 0..length {
                        list.push(Tag::read_payload(reader, element_type)?);
                    }
                }
                Ok(Tag::List(list))
            }
            TAG_COMPOUND => {
                let mut compound = HashMap::new();
                loop {
                    let entry_type = reader.read_u8()?;
                    if entry_type == TAG_END {
                        break;
                    }
                    let name = read_name(reader)?;
                    compound.insert(name, Tag::read_payload(reader, entry_type)?);
                }
                Ok(Tag::Compound(compound))
            }
            TAG_BYTE_ARRAY => Err(DecodeError::UnimplementedNbtTag("TAG_Byte_Array")),
            TAG_INT_ARRAY => Err(DecodeError::UnimplementedNbtTag("TAG_Int_Array")),
            TAG_LONG_ARRAY => Err(DecodeError::UnimplementedNbtTag("TAG_Long_Array")),
            other => Err(DecodeError::UnknownNbtTag(other)),
        }
    }

    pub fn as_compound(&self) -> Option<&HashMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Tag>> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }
}

fn read_name(reader: &mut PacketReader<'_>) -> Result<String, DecodeError> {
    let length = reader.read_u16()?;
    reader.read_char_array(length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::SliceSource;
    use assert_matches::assert_matches;

    fn read(bytes: &[u8]) -> Result<(String, Tag), DecodeError> {
        let mut source = SliceSource::new(bytes);
        let mut reader = PacketReader::new(&mut source, bytes.len());
        Tag::read_root(&mut reader)
    }

    fn named(type_id: u8, name: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![type_id];
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_numeric_leaves() {
        let (name, tag) = read(&named(3, "answer", &42i32.to_be_bytes())).unwrap();
        assert_eq!(name, "answer");
        assert_eq!(tag, Tag::Int(42));

        let (_, tag) = read(&named(6, "pi", &3.25f64.to_be_bytes())).unwrap();
        assert_eq!(tag.as_f64(), Some(3.25));
    }

    #[test]
    fn test_string_leaf() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&5u16.to_be_bytes());
        payload.extend_from_slice(b"hello");
        let (_, tag) = read(&named(8, "greeting", &payload)).unwrap();
        assert_eq!(tag.as_string(), Some("hello"));
    }

    #[test]
    fn test_list_of_shorts() {
        let mut payload = vec![2]; // element type: short
        payload.extend_from_slice(&3i32.to_be_bytes());
        for v in [1i16, 2, 3] {
            payload.extend_from_slice(&v.to_be_bytes());
        }
        let (_, tag) = read(&named(9, "list", &payload)).unwrap();
        assert_eq!(
            tag.as_list().unwrap().as_slice(),
            &[Tag::Short(1), Tag::Short(2), Tag::Short(3)]
        );
    }

    #[test]
    fn test_nested_compound() {
        // compound { byte "b" = 7, compound "inner" { long "l" = -1 } }
        let mut payload = Vec::new();
        payload.extend_from_slice(&named(1, "b", &[7]));
        let inner = {
            let mut p = named(4, "l", &(-1i64).to_be_bytes());
            p.push(0); // TAG_End
            p
        };
        payload.extend_from_slice(&named(10, "inner", &inner));
        payload.push(0); // TAG_End
        let (name, tag) = read(&named(10, "root", &payload)).unwrap();
        assert_eq!(name, "root");
        let root = tag.as_compound().unwrap();
        assert_eq!(root.get("b").unwrap().as_i8(), Some(7));
        let inner = root.get("inner").unwrap().as_compound().unwrap();
        assert_eq!(inner.get("l").unwrap().as_i64(), Some(-1));
    }

    #[test]
    fn test_root_end_tag_rejected() {
        assert_matches!(read(&[0]), Err(DecodeError::UnexpectedNbtEnd));
    }

    #[test]
    fn test_unknown_tag_id() {
        assert_matches!(read(&named(42, "x", &[])), Err(DecodeError::UnknownNbtTag(42)));
    }

    #[test]
    fn test_array_tags_fail_loudly() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&3i32.to_be_bytes());
        payload.extend_from_slice(&[1, 2, 3]);
        assert_matches!(
            read(&named(7, "arr", &payload)),
            Err(DecodeError::UnimplementedNbtTag("TAG_Byte_Array"))
        );
        assert_matches!(
            read(&named(11, "arr", &payload)),
            Err(DecodeError::UnimplementedNbtTag("TAG_Int_Array"))
        );
        assert_matches!(
            read(&named(12, "arr", &payload)),
            Err(DecodeError::UnimplementedNbtTag("TAG_Long_Array"))
        );
    }

    #[test]
    fn test_truncated_compound() {
        // Compound that never reaches TAG_End runs out of budget.
        let bytes = named(10, "root", &[1]);
        assert_matches!(read(&bytes), Err(DecodeError::UnexpectedEnd));
    }
}
