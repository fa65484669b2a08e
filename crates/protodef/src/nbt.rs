//! Named Binary Tag trees embedded in packets.
//!
//! Tags are big-endian. Strings carry a `u16` length prefix; lists carry an
//! element tag id and an `i32` length; compounds run until `TAG_End`.

use indexmap::IndexMap;
use protodef_buffers::Reader;

use crate::error::DecodeError;

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_BYTE_ARRAY: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

/// A single NBT payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtTag>),
    Compound(IndexMap<String, NbtTag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

/// A root tag, with the name that precedes it in the named form.
#[derive(Debug, Clone, PartialEq)]
pub struct Nbt {
    pub name: Option<String>,
    pub tag: NbtTag,
}

impl From<NbtTag> for serde_json::Value {
    fn from(tag: NbtTag) -> Self {
        use serde_json::{json, Value};
        match tag {
            NbtTag::End => Value::Null,
            NbtTag::Byte(v) => json!(v),
            NbtTag::Short(v) => json!(v),
            NbtTag::Int(v) => json!(v),
            NbtTag::Long(v) => json!(v),
            NbtTag::Float(v) => json!(v),
            NbtTag::Double(v) => json!(v),
            NbtTag::ByteArray(v) => json!(v),
            NbtTag::String(v) => Value::String(v),
            NbtTag::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            NbtTag::Compound(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            NbtTag::IntArray(v) => json!(v),
            NbtTag::LongArray(v) => json!(v),
        }
    }
}

/// Reads NBT payloads from a packet cursor.
pub struct NbtReader<'r, 'a> {
    reader: &'r mut Reader<'a>,
    max_depth: usize,
}

impl<'r, 'a> NbtReader<'r, 'a> {
    pub fn new(reader: &'r mut Reader<'a>, max_depth: usize) -> Self {
        Self { reader, max_depth }
    }

    /// Reads a root tag.
    ///
    /// `named` selects the classic form with a name after the tag id;
    /// `optional` turns a leading `TAG_End` into `None`.
    pub fn read_root(&mut self, named: bool, optional: bool) -> Result<Option<Nbt>, DecodeError> {
        let id = self.reader.u8()?;
        if id == TAG_END {
            return Ok(if optional {
                None
            } else {
                Some(Nbt {
                    name: None,
                    tag: NbtTag::End,
                })
            });
        }
        let name = if named { Some(self.read_string()?) } else { None };
        let tag = self.read_payload(id, 0)?;
        Ok(Some(Nbt { name, tag }))
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.reader.u16()? as usize;
        let bytes = self.reader.buf(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.reader.i32()?;
        usize::try_from(len).map_err(|_| DecodeError::NegativeLength(len as i64))
    }

    fn read_payload(&mut self, id: u8, depth: usize) -> Result<NbtTag, DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::NbtTooDeep(self.max_depth));
        }
        let tag = match id {
            TAG_END => NbtTag::End,
            TAG_BYTE => NbtTag::Byte(self.reader.i8()?),
            TAG_SHORT => NbtTag::Short(self.reader.i16()?),
            TAG_INT => NbtTag::Int(self.reader.i32()?),
            TAG_LONG => NbtTag::Long(self.reader.i64()?),
            TAG_FLOAT => NbtTag::Float(self.reader.f32()?),
            TAG_DOUBLE => NbtTag::Double(self.reader.f64()?),
            TAG_BYTE_ARRAY => {
                let len = self.read_len()?;
                let bytes = self.reader.buf(len)?;
                NbtTag::ByteArray(bytes.iter().map(|b| *b as i8).collect())
            }
            TAG_STRING => NbtTag::String(self.read_string()?),
            TAG_LIST => {
                let item_id = self.reader.u8()?;
                let len = self.read_len()?;
                // Only empty lists may have TAG_End elements; any other
                // element takes at least one byte.
                if item_id == TAG_END && len > 0 {
                    return Err(DecodeError::InvalidNbtTag(TAG_END));
                }
                if len > self.reader.size() {
                    return Err(DecodeError::Buffer(protodef_buffers::BufferError::EndOfBuffer));
                }
                let mut items = Vec::with_capacity(len.min(self.reader.size()));
                for _ in 0..len {
                    items.push(self.read_payload(item_id, depth + 1)?);
                }
                NbtTag::List(items)
            }
            TAG_COMPOUND => {
                let mut map = IndexMap::new();
                loop {
                    let child_id = self.reader.u8()?;
                    if child_id == TAG_END {
                        break;
                    }
                    let name = self.read_string()?;
                    let child = self.read_payload(child_id, depth + 1)?;
                    map.insert(name, child);
                }
                NbtTag::Compound(map)
            }
            TAG_INT_ARRAY => {
                let len = self.read_len()?;
                let mut out = Vec::with_capacity(len.min(self.reader.size() / 4));
                for _ in 0..len {
                    out.push(self.reader.i32()?);
                }
                NbtTag::IntArray(out)
            }
            TAG_LONG_ARRAY => {
                let len = self.read_len()?;
                let mut out = Vec::with_capacity(len.min(self.reader.size() / 8));
                for _ in 0..len {
                    out.push(self.reader.i64()?);
                }
                NbtTag::LongArray(out)
            }
            other => return Err(DecodeError::InvalidNbtTag(other)),
        };
        Ok(tag)
    }
}
