//! The table of every loaded type, keyed by [`TypeId`].

use std::collections::HashMap;
use std::sync::Arc;

use protodef_buffers::Reader;
use serde_json::{Map, Value};

use crate::builder;
use crate::error::{DecodeError, LookupError, SchemaError};
use crate::handler::{
    json_kind, BoolType, NbtKind, NbtType, NumericKind, NumericType, RestBufferType, TypeHandler, UuidType,
    VoidType,
};
use crate::options::DecoderOptions;
use crate::record::PacketRecord;
use crate::type_id::{TypeId, PLACEHOLDER_NAMES};
use crate::value::PacketValue;

/// Result of a top-level decode.
#[derive(Debug, Clone)]
pub struct DecodedPacket {
    /// Value returned by the root handler.
    pub value: PacketValue,
    /// Every named field decoded along the way.
    pub record: PacketRecord,
    /// Bytes the root handler consumed.
    pub consumed: usize,
}

/// Loaded types plus the decoder limits.
///
/// Seeded with the native types: concrete handlers for numbers, `bool`,
/// `void`, `UUID`, `restBuffer` and NBT, and placeholder entries for the
/// parameterized kinds. Registration is insert-only, so the first handler
/// registered for an id stays for the registry's life (or until
/// [`reset`](Self::reset)).
///
/// Loading needs `&mut self` and decoding `&self`, so a registry cannot be
/// extended while a packet is being decoded.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<TypeId, Option<Arc<TypeHandler>>>,
    options: DecoderOptions,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            types: native_types().collect(),
            options,
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Inserts `handler` under `id` unless something is registered there
    /// already. Returns whether it was inserted.
    pub fn register_type(&mut self, id: TypeId, handler: Arc<TypeHandler>) -> bool {
        if self.types.contains_key(&id) {
            tracing::trace!(%id, "type already registered");
            return false;
        }
        self.types.insert(id, Some(handler));
        true
    }

    /// The concrete handler for `id`.
    pub fn get_handler(&self, id: &TypeId) -> Result<Arc<TypeHandler>, LookupError> {
        match self.types.get(id) {
            Some(Some(handler)) => Ok(handler.clone()),
            Some(None) => Err(LookupError::Placeholder(id.clone())),
            None => Err(LookupError::Unknown(id.clone())),
        }
    }

    /// Like [`get_handler`](Self::get_handler), `None` for placeholders too.
    pub fn try_get_handler(&self, id: &TypeId) -> Option<Arc<TypeHandler>> {
        self.types.get(id).and_then(Clone::clone)
    }

    /// True for registered ids, placeholders included.
    pub fn contains(&self, id: &TypeId) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Ids registered beyond the native set, sorted.
    pub fn custom_type_ids(&self) -> Vec<&TypeId> {
        let mut ids: Vec<&TypeId> = self.types.keys().filter(|id| !id.is_native()).collect();
        ids.sort();
        ids
    }

    /// Drops every loaded type and restores the native set.
    pub fn reset(&mut self) {
        let before = self.types.len();
        self.types.clear();
        self.types.extend(native_types());
        tracing::debug!(dropped = before - self.types.len(), "registry reset");
    }

    /// Registers every namespace of a protocol document, starting from the
    /// global scope.
    pub fn load(&mut self, doc: &Value) -> Result<(), SchemaError> {
        let Value::Object(doc) = doc else {
            return Err(SchemaError::MalformedDefinition { found: json_kind(doc) });
        };
        builder::register_types_recursive(self, "", doc)
    }

    pub fn load_str(&mut self, text: &str) -> Result<(), SchemaError> {
        let doc: Value = serde_json::from_str(text)?;
        self.load(&doc)
    }

    /// Registers the types of one namespace. See
    /// [`builder::register_types`].
    pub fn register_types(&mut self, scope: &str, type_dict: &Map<String, Value>) -> Result<(), SchemaError> {
        builder::register_types(self, scope, type_dict)
    }

    /// Decodes `bytes` as the type `root`.
    pub fn decode(&self, root: &TypeId, bytes: &[u8]) -> Result<DecodedPacket, DecodeError> {
        let mut reader = Reader::new(bytes);
        self.decode_with_record(root, PacketRecord::new(), &mut reader)
    }

    /// Decodes one value of type `root` from `reader` into `record`.
    ///
    /// Trailing bytes are not an error.
    pub fn decode_with_record(
        &self,
        root: &TypeId,
        mut record: PacketRecord,
        reader: &mut Reader<'_>,
    ) -> Result<DecodedPacket, DecodeError> {
        let handler = self.get_handler(root)?;
        let start = reader.position();
        let value = handler.read_value(self, &mut record, "", "", reader)?;
        let consumed = reader.position() - start;
        if !reader.is_empty() {
            tracing::debug!(%root, consumed, remaining = reader.size(), "bytes left after decoding packet");
        }
        Ok(DecodedPacket {
            value,
            record,
            consumed,
        })
    }
}

fn native_types() -> impl Iterator<Item = (TypeId, Option<Arc<TypeHandler>>)> {
    let numerics = NumericKind::ALL
        .into_iter()
        .map(|kind| TypeHandler::Numeric(NumericType::new(kind)));
    let nbts = [
        NbtKind::Named,
        NbtKind::Optional,
        NbtKind::Anonymous,
        NbtKind::AnonOptional,
    ]
    .into_iter()
    .map(|kind| TypeHandler::Nbt(NbtType::new(kind)));
    let others = [
        TypeHandler::Bool(BoolType::new()),
        TypeHandler::Void(VoidType::new()),
        TypeHandler::Uuid(UuidType::new()),
        TypeHandler::RestBuffer(RestBufferType::new()),
    ];
    let concrete = numerics
        .chain(nbts)
        .chain(others)
        .map(|handler| (handler.type_id().clone(), Some(Arc::new(handler))));
    let placeholders = PLACEHOLDER_NAMES
        .into_iter()
        .map(|name| (TypeId::native(name), None));
    concrete.chain(placeholders)
}
