//! Buffers, bitfields, mappers and length-prefixed strings.

use std::sync::Arc;

use indexmap::IndexMap;
use protodef_buffers::Reader;
use serde_json::{Map, Value};

use super::{build_param, json_kind, param_array, param_object, to_length, BuildItem, CountSource, TypeHandler};
use crate::error::{DecodeError, SchemaError};
use crate::record::{get_absolute_path, PacketRecord};
use crate::registry::TypeRegistry;
use crate::type_id::{self as n, TypeId};
use crate::value::{PacketValue, ValueKind};

#[derive(Debug, Clone)]
pub enum BufferLength {
    Counted(CountSource),
    /// Everything left in the packet.
    Rest,
}

/// Raw bytes.
#[derive(Debug, Clone)]
pub struct BufferType {
    pub id: TypeId,
    pub length: BufferLength,
}

impl BufferType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&BufferType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let params = param_object(n::BUFFER, params)?;
        let rest = params
            .and_then(|p| p.get("rest"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let length = if rest {
            BufferLength::Rest
        } else if let Some(count) = CountSource::from_params(n::BUFFER, params, build_item)? {
            BufferLength::Counted(count)
        } else {
            inherited
                .map(|p| p.length.clone())
                .ok_or(SchemaError::MissingParam { kind: n::BUFFER, key: "countType" })?
        };
        Ok(Self { id, length })
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let bytes = match &self.length {
            BufferLength::Rest => reader.rest(),
            BufferLength::Counted(count) => {
                let len = to_length(count.read(registry, rec, parent_path, path, reader)?)?;
                reader.buf(len)?
            }
        };
        Ok(PacketValue::Bytes(bytes.to_vec()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldField {
    pub name: String,
    pub size: u32,
    pub signed: bool,
}

/// Packed integers, most significant bit first.
///
/// The fields are read from `ceil(total_bits / 8)` big-endian bytes.
#[derive(Debug, Clone)]
pub struct BitfieldType {
    pub id: TypeId,
    pub fields: Vec<BitfieldField>,
    bytes: usize,
}

impl BitfieldType {
    pub fn build(id: TypeId, params: Option<&Value>) -> Result<Self, SchemaError> {
        let entries = param_array(n::BITFIELD, params)?;
        let mut fields = Vec::with_capacity(entries.len());
        let mut total = 0u32;
        for entry in entries {
            let Value::Object(entry) = entry else {
                return Err(SchemaError::invalid(
                    n::BITFIELD,
                    "params",
                    format!("field must be an object, found {}", json_kind(entry)),
                ));
            };
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .ok_or(SchemaError::MissingParam { kind: n::BITFIELD, key: "name" })?;
            let size = entry
                .get("size")
                .and_then(Value::as_u64)
                .ok_or(SchemaError::MissingParam { kind: n::BITFIELD, key: "size" })?;
            if !(1..=64).contains(&size) {
                return Err(SchemaError::invalid(
                    n::BITFIELD,
                    "size",
                    format!("{} is not between 1 and 64", size),
                ));
            }
            let signed = entry.get("signed").and_then(Value::as_bool).unwrap_or(false);
            total += size as u32;
            fields.push(BitfieldField {
                name: name.to_string(),
                size: size as u32,
                signed,
            });
        }
        if total > 128 {
            return Err(SchemaError::invalid(
                n::BITFIELD,
                "params",
                format!("{} bits do not fit in 128", total),
            ));
        }
        Ok(Self {
            id,
            fields,
            bytes: total.div_ceil(8) as usize,
        })
    }

    pub(crate) fn read_value(
        &self,
        rec: &mut PacketRecord,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let raw = reader
            .buf(self.bytes)?
            .iter()
            .fold(0u128, |acc, b| (acc << 8) | *b as u128);
        let mut remaining = (self.bytes * 8) as u32;
        let mut out = IndexMap::with_capacity(self.fields.len());
        for field in &self.fields {
            remaining -= field.size;
            let mask = (1u128 << field.size) - 1;
            let bits = (raw >> remaining) & mask;
            let value = if field.signed && bits >> (field.size - 1) & 1 == 1 {
                PacketValue::Int((bits as i128 - (1i128 << field.size)) as i64)
            } else {
                match i64::try_from(bits) {
                    Ok(v) => PacketValue::Int(v),
                    Err(_) => PacketValue::UInt(bits as u64),
                }
            };
            rec.write_entry(
                &get_absolute_path(path, &field.name),
                value.clone(),
                TypeId::native(if field.signed { n::I64 } else { n::U64 }),
            );
            out.insert(field.name.clone(), value);
        }
        Ok(PacketValue::Object(out))
    }
}

/// Translates a decoded number into a symbolic name.
#[derive(Debug, Clone)]
pub struct MapperType {
    pub id: TypeId,
    pub inner: Arc<TypeHandler>,
    /// Normalized key to name.
    pub mappings: IndexMap<String, String>,
    /// Unmapped values come through unchanged instead of failing.
    pub passthrough: bool,
}

impl MapperType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&MapperType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let params = param_object(n::MAPPER, params)?;
        let inner = match build_param(params, "type", build_item)? {
            Some(inner) => inner,
            None => inherited
                .map(|p| p.inner.clone())
                .ok_or(SchemaError::MissingParam { kind: n::MAPPER, key: "type" })?,
        };
        let mappings = match params.and_then(|p| p.get("mappings")) {
            Some(Value::Object(map)) => parse_mappings(map)?,
            Some(other) => {
                return Err(SchemaError::invalid(
                    n::MAPPER,
                    "mappings",
                    format!("expected an object, found {}", json_kind(other)),
                ))
            }
            None => inherited
                .map(|p| p.mappings.clone())
                .ok_or(SchemaError::MissingParam { kind: n::MAPPER, key: "mappings" })?,
        };
        let passthrough = params
            .and_then(|p| p.get("passthrough"))
            .and_then(Value::as_bool)
            .or_else(|| inherited.map(|p| p.passthrough))
            .unwrap_or(false);
        Ok(Self {
            id,
            inner,
            mappings,
            passthrough,
        })
    }

    pub fn value_kind(&self) -> ValueKind {
        if self.passthrough {
            ValueKind::Any
        } else {
            ValueKind::Str
        }
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let raw = self.inner.read_value(registry, rec, parent_path, path, reader)?;
        let key = raw.switch_key();
        match self.mappings.get(&key) {
            Some(name) => Ok(PacketValue::Str(name.clone())),
            None if self.passthrough => Ok(raw),
            None => Err(DecodeError::UnmappedValue(key)),
        }
    }
}

fn parse_mappings(map: &Map<String, Value>) -> Result<IndexMap<String, String>, SchemaError> {
    let mut out = IndexMap::with_capacity(map.len());
    for (key, name) in map {
        let Value::String(name) = name else {
            return Err(SchemaError::invalid(
                n::MAPPER,
                "mappings",
                format!("value for {:?} must be a string, found {}", key, json_kind(name)),
            ));
        };
        out.insert(normalize_mapping_key(key), name.clone());
    }
    Ok(out)
}

/// `"0x10"` and `"016"` both become `"16"`; non-numeric keys stay as they are.
fn normalize_mapping_key(key: &str) -> String {
    let hex = key
        .strip_prefix("0x")
        .or_else(|| key.strip_prefix("0X"))
        .and_then(|digits| i64::from_str_radix(digits, 16).ok());
    match hex.or_else(|| key.parse::<i64>().ok()) {
        Some(v) => v.to_string(),
        None => key.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl StringEncoding {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "ascii" | "us-ascii" => Some(Self::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Some(Self::Latin1),
            _ => None,
        }
    }

    fn decode(self, reader: &mut Reader<'_>, len: usize) -> Result<String, DecodeError> {
        Ok(match self {
            Self::Utf8 => reader.utf8(len)?.to_string(),
            Self::Ascii => reader
                .buf(len)?
                .iter()
                .map(|b| if b.is_ascii() { *b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Self::Latin1 => reader.buf(len)?.iter().map(|b| *b as char).collect(),
        })
    }
}

/// A string behind a length prefix.
#[derive(Debug, Clone)]
pub struct PStringType {
    pub id: TypeId,
    pub count: CountSource,
    pub encoding: StringEncoding,
}

impl PStringType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&PStringType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let params = param_object(n::PSTRING, params)?;
        let count = match CountSource::from_params(n::PSTRING, params, build_item)? {
            Some(count) => count,
            None => inherited
                .map(|p| p.count.clone())
                .ok_or(SchemaError::MissingParam { kind: n::PSTRING, key: "countType" })?,
        };
        let encoding = match params.and_then(|p| p.get("encoding")) {
            Some(Value::String(name)) => StringEncoding::parse(name).ok_or_else(|| {
                SchemaError::invalid(n::PSTRING, "encoding", format!("unsupported encoding {:?}", name))
            })?,
            Some(other) => {
                return Err(SchemaError::invalid(
                    n::PSTRING,
                    "encoding",
                    format!("expected a string, found {}", json_kind(other)),
                ))
            }
            None => inherited.map(|p| p.encoding).unwrap_or_default(),
        };
        Ok(Self { id, count, encoding })
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let len = to_length(self.count.read(registry, rec, parent_path, path, reader)?)?;
        Ok(PacketValue::Str(self.encoding.decode(reader, len)?))
    }
}
