//! Minecraft protocol extensions.

use std::sync::Arc;

use protodef_buffers::{BufferError, Reader};
use serde_json::Value;
use uuid::Uuid;

use super::structure::read_elements;
use super::{element_path, json_kind, param_object, to_element_count, BuildItem, CountSource, TypeHandler};
use crate::error::{DecodeError, SchemaError};
use crate::nbt::NbtReader;
use crate::record::PacketRecord;
use crate::registry::TypeRegistry;
use crate::type_id::{self as n, TypeId};
use crate::value::PacketValue;

/// 16 bytes, most significant first.
#[derive(Debug, Clone)]
pub struct UuidType {
    pub id: TypeId,
}

impl UuidType {
    pub fn new() -> Self {
        Self {
            id: TypeId::native(n::UUID),
        }
    }

    pub(crate) fn read_value(&self, reader: &mut Reader<'_>) -> Result<PacketValue, DecodeError> {
        let bytes = reader.buf(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(PacketValue::Uuid(Uuid::from_bytes(raw)))
    }
}

impl Default for UuidType {
    fn default() -> Self {
        Self::new()
    }
}

/// Items until a sentinel byte. The sentinel is consumed.
#[derive(Debug, Clone)]
pub struct EntityMetadataLoopType {
    pub id: TypeId,
    pub item: Arc<TypeHandler>,
    pub end_val: u8,
}

impl EntityMetadataLoopType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&EntityMetadataLoopType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let kind = n::ENTITY_METADATA_LOOP;
        let params = param_object(kind, params)?;
        let item = match params.and_then(|p| p.get("type")) {
            Some(token) => build_item(token)?,
            None => inherited
                .map(|p| p.item.clone())
                .ok_or(SchemaError::MissingParam { kind, key: "type" })?,
        };
        let end_val = match params.and_then(|p| p.get("endVal")) {
            Some(v) => v
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| SchemaError::invalid(kind, "endVal", format!("{} is not a byte", v)))?,
            None => inherited
                .map(|p| p.end_val)
                .ok_or(SchemaError::MissingParam { kind, key: "endVal" })?,
        };
        Ok(Self { id, item, end_val })
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let limit = registry.options().max_array_length;
        let mut out = Vec::new();
        loop {
            if reader.peek()? == self.end_val {
                reader.skip(1)?;
                return Ok(PacketValue::Array(out));
            }
            if out.len() >= limit {
                return Err(DecodeError::LengthTooLarge {
                    length: out.len() + 1,
                    limit,
                });
            }
            let value = self
                .item
                .read_value(registry, rec, parent_path, &element_path(path, out.len()), reader)?;
            out.push(value);
        }
    }
}

/// Items whose first byte carries a continuation flag in its top bit.
///
/// The flag is masked off before the item is decoded; the array ends after
/// the first item whose flag is clear.
#[derive(Debug, Clone)]
pub struct TopBitSetTerminatedArrayType {
    pub id: TypeId,
    pub item: Arc<TypeHandler>,
}

impl TopBitSetTerminatedArrayType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&TopBitSetTerminatedArrayType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let kind = n::TOP_BIT_SET_TERMINATED_ARRAY;
        let params = param_object(kind, params)?;
        let item = match params.and_then(|p| p.get("type")) {
            Some(token) => build_item(token)?,
            None => inherited
                .map(|p| p.item.clone())
                .ok_or(SchemaError::MissingParam { kind, key: "type" })?,
        };
        Ok(Self { id, item })
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let limit = registry.options().max_array_length;
        // One copy of the remaining bytes; each item's flag byte is cleared in
        // place right before the item is decoded from it.
        let mut masked = reader.uint8[reader.x..reader.end].to_vec();
        let mut offset = 0;
        let mut out = Vec::new();
        loop {
            let first = *masked.get(offset).ok_or(BufferError::EndOfBuffer)?;
            if out.len() >= limit {
                return Err(DecodeError::LengthTooLarge {
                    length: out.len() + 1,
                    limit,
                });
            }
            masked[offset] = first & 0x7f;
            let mut sub = Reader::from_slice(&masked, offset, masked.len());
            let value = self
                .item
                .read_value(registry, rec, parent_path, &element_path(path, out.len()), &mut sub)?;
            offset = sub.position();
            out.push(value);
            if first & 0x80 == 0 {
                reader.skip(offset)?;
                return Ok(PacketValue::Array(out));
            }
        }
    }
}

/// Everything left in the packet.
#[derive(Debug, Clone)]
pub struct RestBufferType {
    pub id: TypeId,
}

impl RestBufferType {
    pub fn new() -> Self {
        Self {
            id: TypeId::native(n::REST_BUFFER),
        }
    }

    pub(crate) fn read_value(&self, reader: &mut Reader<'_>) -> PacketValue {
        PacketValue::Bytes(reader.rest().to_vec())
    }
}

impl Default for RestBufferType {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NbtKind {
    /// `nbt`: tag id, name, payload.
    Named,
    /// `optionalNbt`: like `nbt`, a lone `TAG_End` decodes to null.
    Optional,
    /// `anonymousNbt`: tag id and payload, no name.
    Anonymous,
    /// `anonOptionalNbt`: unnamed, a lone `TAG_End` decodes to null.
    AnonOptional,
}

impl NbtKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            n::NBT => Some(Self::Named),
            n::OPTIONAL_NBT => Some(Self::Optional),
            n::ANONYMOUS_NBT => Some(Self::Anonymous),
            n::ANON_OPTIONAL_NBT => Some(Self::AnonOptional),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Named => n::NBT,
            Self::Optional => n::OPTIONAL_NBT,
            Self::Anonymous => n::ANONYMOUS_NBT,
            Self::AnonOptional => n::ANON_OPTIONAL_NBT,
        }
    }

    fn named(self) -> bool {
        matches!(self, Self::Named | Self::Optional)
    }

    fn optional(self) -> bool {
        matches!(self, Self::Optional | Self::AnonOptional)
    }
}

#[derive(Debug, Clone)]
pub struct NbtType {
    pub id: TypeId,
    pub kind: NbtKind,
}

impl NbtType {
    pub fn new(kind: NbtKind) -> Self {
        Self {
            id: TypeId::native(kind.name()),
            kind,
        }
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let max_depth = registry.options().max_nbt_depth;
        let nbt = NbtReader::new(reader, max_depth).read_root(self.kind.named(), self.kind.optional())?;
        Ok(match nbt {
            Some(nbt) => PacketValue::Nbt(Box::new(nbt)),
            None => PacketValue::Null,
        })
    }
}

/// An array whose decoded count is shifted by `lengthOffset`.
#[derive(Debug, Clone)]
pub struct ArrayWithLengthOffsetType {
    pub id: TypeId,
    pub item: Arc<TypeHandler>,
    pub count: CountSource,
    pub length_offset: i64,
}

impl ArrayWithLengthOffsetType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&ArrayWithLengthOffsetType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let kind = n::ARRAY_WITH_LENGTH_OFFSET;
        let params = param_object(kind, params)?;
        let item = match params.and_then(|p| p.get("type")) {
            Some(token) => build_item(token)?,
            None => inherited
                .map(|p| p.item.clone())
                .ok_or(SchemaError::MissingParam { kind, key: "type" })?,
        };
        let count = match CountSource::from_params(kind, params, build_item)? {
            Some(count) => count,
            None => inherited
                .map(|p| p.count.clone())
                .ok_or(SchemaError::MissingParam { kind, key: "countType" })?,
        };
        let length_offset = match params.and_then(|p| p.get("lengthOffset")) {
            Some(v) => v.as_i64().ok_or_else(|| {
                SchemaError::invalid(kind, "lengthOffset", format!("expected an integer, found {}", json_kind(v)))
            })?,
            None => inherited.map(|p| p.length_offset).unwrap_or(0),
        };
        Ok(Self {
            id,
            item,
            count,
            length_offset,
        })
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let raw = self.count.read(registry, rec, parent_path, path, reader)?;
        let count = to_element_count(raw.saturating_add(self.length_offset), registry)?;
        read_elements(&self.item, count, registry, rec, parent_path, path, reader)
    }
}
