//! Type handlers: one variant per wire kind.
//!
//! Every handler owns its [`TypeId`], reports the [`ValueKind`] it decodes
//! to and consumes exactly the bytes its format defines.
//!
//! Decoding passes two paths around:
//! - `parent_path`: the enclosing container, which `compareTo` and count
//!   references resolve against;
//! - `path`: where this value's own named children are written.
//!
//! A named container field `x` of a container at `p` is read with
//! `(p, p/x)`. An anonymous field is read with `(p, p)` so that its fields
//! land in the enclosing namespace. Element `i` of an array at `p/x` is read
//! with `(p, p/x[i])`, which keeps `../` inside an element pointing at the
//! array's enclosing container.

pub mod conditional;
pub mod numeric;
pub mod primitive;
pub mod structure;
pub mod utils;
pub mod xtended;

use std::sync::Arc;

use protodef_buffers::Reader;
use serde_json::{Map, Value};

use crate::error::{DecodeError, SchemaError};
use crate::record::{get_absolute_path, PacketRecord};
use crate::registry::TypeRegistry;
use crate::type_id::TypeId;
use crate::value::{PacketValue, ValueKind};

pub use conditional::{OptionType, SwitchType};
pub use numeric::{NumericKind, NumericType};
pub use primitive::{BoolType, VoidType};
pub use structure::{ArrayType, ContainerField, ContainerType};
pub use utils::{BitfieldField, BitfieldType, BufferType, MapperType, PStringType, StringEncoding};
pub use xtended::{
    ArrayWithLengthOffsetType, EntityMetadataLoopType, NbtKind, NbtType, RestBufferType,
    TopBitSetTerminatedArrayType, UuidType,
};

/// Builds the handler for a nested type definition (a container field, an
/// array element, a switch case, ...).
pub type BuildItem<'f, 'a> = dyn FnMut(&'a Value) -> Result<Arc<TypeHandler>, SchemaError> + 'f;

/// The closed set of wire kinds.
#[derive(Debug, Clone)]
pub enum TypeHandler {
    Numeric(NumericType),
    Bool(BoolType),
    Void(VoidType),
    Array(ArrayType),
    Container(ContainerType),
    Switch(SwitchType),
    Option(OptionType),
    Buffer(BufferType),
    Bitfield(BitfieldType),
    Mapper(MapperType),
    PString(PStringType),
    Uuid(UuidType),
    EntityMetadataLoop(EntityMetadataLoopType),
    TopBitSetTerminatedArray(TopBitSetTerminatedArrayType),
    RestBuffer(RestBufferType),
    Nbt(NbtType),
    ArrayWithLengthOffset(ArrayWithLengthOffsetType),
    /// Forwards to another registered type, looked up at decode time.
    Proxy(ProxyType),
}

impl TypeHandler {
    pub fn type_id(&self) -> &TypeId {
        match self {
            Self::Numeric(t) => &t.id,
            Self::Bool(t) => &t.id,
            Self::Void(t) => &t.id,
            Self::Array(t) => &t.id,
            Self::Container(t) => &t.id,
            Self::Switch(t) => &t.id,
            Self::Option(t) => &t.id,
            Self::Buffer(t) => &t.id,
            Self::Bitfield(t) => &t.id,
            Self::Mapper(t) => &t.id,
            Self::PString(t) => &t.id,
            Self::Uuid(t) => &t.id,
            Self::EntityMetadataLoop(t) => &t.id,
            Self::TopBitSetTerminatedArray(t) => &t.id,
            Self::RestBuffer(t) => &t.id,
            Self::Nbt(t) => &t.id,
            Self::ArrayWithLengthOffset(t) => &t.id,
            Self::Proxy(t) => &t.id,
        }
    }

    /// The wire kind, named as in ProtoDef.
    pub fn kind(&self) -> &'static str {
        use crate::type_id as n;
        match self {
            Self::Numeric(t) => t.kind.name(),
            Self::Bool(_) => n::BOOL,
            Self::Void(_) => n::VOID,
            Self::Array(_) => n::ARRAY,
            Self::Container(_) => n::CONTAINER,
            Self::Switch(_) => n::SWITCH,
            Self::Option(_) => n::OPTION,
            Self::Buffer(_) => n::BUFFER,
            Self::Bitfield(_) => n::BITFIELD,
            Self::Mapper(_) => n::MAPPER,
            Self::PString(_) => n::PSTRING,
            Self::Uuid(_) => n::UUID,
            Self::EntityMetadataLoop(_) => n::ENTITY_METADATA_LOOP,
            Self::TopBitSetTerminatedArray(_) => n::TOP_BIT_SET_TERMINATED_ARRAY,
            Self::RestBuffer(_) => n::REST_BUFFER,
            Self::Nbt(t) => t.kind.name(),
            Self::ArrayWithLengthOffset(_) => n::ARRAY_WITH_LENGTH_OFFSET,
            Self::Proxy(_) => "proxy",
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            Self::Numeric(t) => t.kind.value_kind(),
            Self::Bool(_) => ValueKind::Bool,
            Self::Void(_) => ValueKind::Null,
            Self::Array(_)
            | Self::EntityMetadataLoop(_)
            | Self::TopBitSetTerminatedArray(_)
            | Self::ArrayWithLengthOffset(_) => ValueKind::Array,
            Self::Container(_) | Self::Bitfield(_) => ValueKind::Object,
            Self::Switch(_) | Self::Option(_) | Self::Proxy(_) => ValueKind::Any,
            Self::Buffer(_) | Self::RestBuffer(_) => ValueKind::Bytes,
            Self::Mapper(t) => t.value_kind(),
            Self::PString(_) => ValueKind::Str,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::Nbt(_) => ValueKind::Nbt,
        }
    }

    /// Decodes one value from `reader`.
    pub fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        match self {
            Self::Numeric(t) => t.read_value(reader),
            Self::Bool(t) => t.read_value(reader),
            Self::Void(t) => Ok(t.read_value()),
            Self::Array(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::Container(t) => t.read_value(registry, rec, path, reader),
            Self::Switch(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::Option(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::Buffer(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::Bitfield(t) => t.read_value(rec, path, reader),
            Self::Mapper(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::PString(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::Uuid(t) => t.read_value(reader),
            Self::EntityMetadataLoop(t) => t.read_value(registry, rec, parent_path, path, reader),
            Self::TopBitSetTerminatedArray(t) => {
                t.read_value(registry, rec, parent_path, path, reader)
            }
            Self::RestBuffer(t) => Ok(t.read_value(reader)),
            Self::Nbt(t) => t.read_value(registry, reader),
            Self::ArrayWithLengthOffset(t) => {
                t.read_value(registry, rec, parent_path, path, reader)
            }
            Self::Proxy(t) => t.read_value(registry, rec, parent_path, path, reader),
        }
    }
}

/// A nested reference to a type declared in the local dictionary. The
/// target may not be built yet when the proxy is created.
///
/// Every recursive schema goes through a proxy, so this is where decode
/// depth is counted against `DecoderOptions::max_depth`.
#[derive(Debug, Clone)]
pub struct ProxyType {
    pub id: TypeId,
    pub target: TypeId,
}

impl ProxyType {
    pub fn new(target: TypeId) -> Self {
        Self {
            id: target.clone(),
            target,
        }
    }

    fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let handler = registry.get_handler(&self.target)?;
        rec.enter(registry.options().max_depth)?;
        let value = handler.read_value(registry, rec, parent_path, path, reader);
        rec.leave();
        value
    }
}

// ---------------------------------------------------------------------------
// Shared parameter handling

/// The params of an overridable kind: absent, or a JSON object.
pub(crate) fn param_object<'a>(
    kind: &'static str,
    params: Option<&'a Value>,
) -> Result<Option<&'a Map<String, Value>>, SchemaError> {
    match params {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(SchemaError::invalid(
            kind,
            "params",
            format!("expected an object, found {}", json_kind(other)),
        )),
    }
}

/// The params of a list-shaped kind (`container`, `bitfield`).
pub(crate) fn param_array<'a>(
    kind: &'static str,
    params: Option<&'a Value>,
) -> Result<&'a Vec<Value>, SchemaError> {
    match params {
        Some(Value::Array(items)) => Ok(items),
        None | Some(Value::Null) => Err(SchemaError::MissingParam { kind, key: "params" }),
        Some(other) => Err(SchemaError::invalid(
            kind,
            "params",
            format!("expected an array, found {}", json_kind(other)),
        )),
    }
}

/// Builds the handler at `key`, if present.
pub(crate) fn build_param<'a>(
    params: Option<&'a Map<String, Value>>,
    key: &str,
    build_item: &mut BuildItem<'_, 'a>,
) -> Result<Option<Arc<TypeHandler>>, SchemaError> {
    match params.and_then(|p| p.get(key)) {
        Some(token) => build_item(token).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Where an array-like type gets its element count from.
#[derive(Debug, Clone)]
pub enum CountSource {
    /// A literal count in the schema.
    Fixed(u64),
    /// A count read inline right before the elements.
    Type(Arc<TypeHandler>),
    /// A previously decoded field, addressed relative to the enclosing
    /// container.
    Field(String),
}

impl CountSource {
    /// Reads `count`/`countType` from params. A literal count wins over a
    /// count type, which wins over a field reference.
    pub(crate) fn from_params<'a>(
        kind: &'static str,
        params: Option<&'a Map<String, Value>>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Option<Self>, SchemaError> {
        let Some(params) = params else {
            return Ok(None);
        };
        let count = params.get("count");
        if let Some(Value::Number(n)) = count {
            let n = n
                .as_u64()
                .ok_or_else(|| SchemaError::invalid(kind, "count", format!("{} is not a length", n)))?;
            return Ok(Some(Self::Fixed(n)));
        }
        if let Some(token) = params.get("countType") {
            return Ok(Some(Self::Type(build_item(token)?)));
        }
        match count {
            Some(Value::String(field)) => Ok(Some(Self::Field(field.clone()))),
            Some(other) => Err(SchemaError::invalid(
                kind,
                "count",
                format!("expected a number or a field reference, found {}", json_kind(other)),
            )),
            None => Ok(None),
        }
    }

    /// Resolves the raw count. Field references must already be decoded.
    pub(crate) fn read(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        parent_path: &str,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<i64, DecodeError> {
        match self {
            Self::Fixed(n) => Ok(i64::try_from(*n).unwrap_or(i64::MAX)),
            Self::Type(handler) => {
                let value = handler.read_value(registry, rec, parent_path, path, reader)?;
                value.as_i64().ok_or_else(|| DecodeError::NonIntegerLength {
                    path: path.to_string(),
                })
            }
            Self::Field(field) => {
                let value = rec.get_entry_value(parent_path, field)?;
                value.as_i64().ok_or_else(|| DecodeError::NonIntegerLength {
                    path: get_absolute_path(parent_path, field),
                })
            }
        }
    }
}

/// Turns a decoded length into a `usize`, rejecting negatives.
pub(crate) fn to_length(raw: i64) -> Result<usize, DecodeError> {
    usize::try_from(raw).map_err(|_| DecodeError::NegativeLength(raw))
}

/// Like [`to_length`], also enforcing the configured element limit.
pub(crate) fn to_element_count(raw: i64, registry: &TypeRegistry) -> Result<usize, DecodeError> {
    let length = to_length(raw)?;
    let limit = registry.options().max_array_length;
    if length > limit {
        return Err(DecodeError::LengthTooLarge { length, limit });
    }
    Ok(length)
}

/// Path of the `index`-th element of the array-like value at `path`.
pub(crate) fn element_path(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}
