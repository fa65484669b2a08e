//! Turns type definitions into handlers.
//!
//! A definition is either a bare type name (`"varint"`) or a
//! `[name, params]` pair (`["array", { "countType": "varint", "type": "u8" }]`).
//! Names resolve against the namespace being loaded first, then its
//! ancestors, then the native set.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::handler::{
    json_kind, ArrayType, ArrayWithLengthOffsetType, BitfieldType, BufferType, ContainerType,
    EntityMetadataLoopType, MapperType, OptionType, PStringType, ProxyType, SwitchType,
    TopBitSetTerminatedArrayType, TypeHandler,
};
use crate::registry::TypeRegistry;
use crate::type_id::{self as n, TypeId};

/// Marks a type provided by the decoder itself in a type dictionary.
pub const NATIVE_MARKER: &str = "native";

fn is_native_marker(definition: &Value) -> bool {
    definition.as_str() == Some(NATIVE_MARKER)
}

/// Parameterized kinds a definition can build on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Switch,
    Option,
    Array,
    Container,
    Buffer,
    Bitfield,
    Mapper,
    PString,
    EntityMetadataLoop,
    TopBitSetTerminatedArray,
    ArrayWithLengthOffset,
}

impl Kind {
    fn from_placeholder(name: &str) -> Option<Self> {
        Some(match name {
            n::SWITCH => Self::Switch,
            n::OPTION => Self::Option,
            n::ARRAY => Self::Array,
            n::CONTAINER => Self::Container,
            n::BUFFER => Self::Buffer,
            n::BITFIELD => Self::Bitfield,
            n::MAPPER => Self::Mapper,
            n::PSTRING => Self::PString,
            n::ENTITY_METADATA_LOOP => Self::EntityMetadataLoop,
            n::TOP_BIT_SET_TERMINATED_ARRAY => Self::TopBitSetTerminatedArray,
            n::ARRAY_WITH_LENGTH_OFFSET => Self::ArrayWithLengthOffset,
            _ => return None,
        })
    }

    /// The kind a named handler can be refined as. `None` for handlers whose
    /// parameters are fixed once built.
    fn overridable(handler: &TypeHandler) -> Option<Self> {
        Some(match handler {
            TypeHandler::Switch(_) => Self::Switch,
            TypeHandler::Array(_) => Self::Array,
            TypeHandler::Buffer(_) => Self::Buffer,
            TypeHandler::Mapper(_) => Self::Mapper,
            TypeHandler::PString(_) => Self::PString,
            TypeHandler::EntityMetadataLoop(_) => Self::EntityMetadataLoop,
            TypeHandler::TopBitSetTerminatedArray(_) => Self::TopBitSetTerminatedArray,
            TypeHandler::ArrayWithLengthOffset(_) => Self::ArrayWithLengthOffset,
            _ => return None,
        })
    }
}

/// Builds the handlers of one namespace.
pub struct TypeBuilder<'r, 'd> {
    pub registry: &'r mut TypeRegistry,
    /// Namespace being loaded; empty for the global one.
    pub scope: &'d str,
    /// Its type dictionary. Entries may be referenced before they are built.
    pub type_dict: &'d Map<String, Value>,
    /// Named types whose build is in progress, for cycle detection.
    building: HashSet<TypeId>,
}

impl<'r, 'd> TypeBuilder<'r, 'd> {
    pub fn new(registry: &'r mut TypeRegistry, scope: &'d str, type_dict: &'d Map<String, Value>) -> Self {
        Self {
            registry,
            scope,
            type_dict,
            building: HashSet::new(),
        }
    }

    /// Qualifies a bare type name.
    ///
    /// 1. declared in the local dictionary: the current scope;
    /// 2. registered in an ancestor scope: the nearest such scope;
    /// 3. a native name: the global scope.
    pub fn resolve_type_id(&self, name: &str) -> Result<TypeId, SchemaError> {
        if self.type_dict.get(name).is_some_and(|d| !is_native_marker(d)) {
            return Ok(TypeId::scoped(self.scope, name));
        }
        let mut scope = self.scope;
        while !scope.is_empty() {
            scope = match scope.rfind('/') {
                Some(pos) => &scope[..pos],
                None => "",
            };
            let id = TypeId::scoped(scope, name);
            if self.registry.contains(&id) {
                return Ok(id);
            }
        }
        if n::is_native_name(name) {
            return Ok(TypeId::native(name));
        }
        Err(SchemaError::UndefinedType {
            scope: self.scope.to_string(),
            name: name.to_string(),
        })
    }

    /// Splits a definition into its underlying type and optional params.
    pub fn underlying_type_and_params(&self, definition: &'d Value) -> Result<(TypeId, Option<&'d Value>), SchemaError> {
        match definition {
            Value::String(name) => Ok((self.resolve_type_id(name)?, None)),
            Value::Array(pair) => match pair.first() {
                Some(Value::String(name)) => Ok((self.resolve_type_id(name)?, pair.get(1))),
                Some(other) => Err(SchemaError::MalformedDefinition { found: json_kind(other) }),
                None => Err(SchemaError::MalformedDefinition { found: "an empty array" }),
            },
            other => Err(SchemaError::MalformedDefinition { found: json_kind(other) }),
        }
    }

    /// Builds the handler for `custom_id`, defined as `underlying_id`
    /// refined by `params`.
    ///
    /// A locally declared underlying type that is not built yet is built and
    /// registered first. When `custom_id` differs from `underlying_id` the
    /// result is registered under `custom_id`.
    pub fn build_handler(
        &mut self,
        custom_id: &TypeId,
        underlying_id: &TypeId,
        params: Option<&'d Value>,
    ) -> Result<Arc<TypeHandler>, SchemaError> {
        if !self.registry.contains(underlying_id) {
            self.build_dependency(custom_id, underlying_id)?;
        }

        let (kind, inherited) = if underlying_id.is_placeholder() {
            (Kind::from_placeholder(underlying_id.name()), None)
        } else {
            let handler = self.registry.get_handler(underlying_id).map_err(|_| SchemaError::MissingDependency {
                custom: custom_id.clone(),
                underlying: underlying_id.clone(),
            })?;
            (Kind::overridable(&handler), Some(handler))
        };

        let handler = match (kind, inherited) {
            (Some(kind), inherited) => Arc::new(self.build_kind(kind, custom_id, params, inherited.as_deref())?),
            (None, Some(handler)) => {
                if params.is_some_and(|p| !p.is_null()) {
                    tracing::warn!(
                        %custom_id,
                        %underlying_id,
                        "parameters ignored, the underlying type cannot be refined"
                    );
                }
                handler
            }
            (None, None) => {
                return Err(SchemaError::MissingDependency {
                    custom: custom_id.clone(),
                    underlying: underlying_id.clone(),
                })
            }
        };

        if custom_id != underlying_id && self.registry.register_type(custom_id.clone(), handler.clone()) {
            tracing::debug!(id = %custom_id, kind = handler.kind(), "registered type");
        }
        Ok(handler)
    }

    /// Builds a locally declared type that another definition depends on.
    fn build_dependency(&mut self, custom_id: &TypeId, underlying_id: &TypeId) -> Result<(), SchemaError> {
        let declared = (underlying_id.scope() == self.scope)
            .then(|| self.type_dict.get(underlying_id.name()))
            .flatten();
        let Some(definition) = declared else {
            return Err(SchemaError::MissingDependency {
                custom: custom_id.clone(),
                underlying: underlying_id.clone(),
            });
        };
        if !self.building.insert(underlying_id.clone()) {
            return Err(SchemaError::CyclicDefinition(underlying_id.clone()));
        }
        tracing::debug!(dependency = %underlying_id, of = %custom_id, "loading dependency");
        let built = self
            .underlying_type_and_params(definition)
            .and_then(|(dep_underlying, dep_params)| self.build_handler(underlying_id, &dep_underlying, dep_params));
        self.building.remove(underlying_id);
        built.map(|_| ())
    }

    /// Builds a nested definition: a container field, an array element, a
    /// switch case. A bare reference to a local type becomes a proxy so that
    /// types can contain themselves.
    pub fn build_item_handler(&mut self, token: &'d Value) -> Result<Arc<TypeHandler>, SchemaError> {
        let (item_id, params) = self.underlying_type_and_params(token)?;
        if params.is_none() && item_id.scope() == self.scope && self.type_dict.contains_key(item_id.name()) {
            tracing::trace!(%item_id, "built proxy");
            return Ok(Arc::new(TypeHandler::Proxy(ProxyType::new(item_id))));
        }
        tracing::trace!(%item_id, "built inline");
        self.build_handler(&item_id, &item_id, params)
    }

    fn build_kind(
        &mut self,
        kind: Kind,
        id: &TypeId,
        params: Option<&'d Value>,
        inherited: Option<&TypeHandler>,
    ) -> Result<TypeHandler, SchemaError> {
        let id = id.clone();
        if inherited.is_some() {
            tracing::trace!(%id, ?kind, "refining named type");
        }
        let mut build_item = |token: &'d Value| self.build_item_handler(token);
        let build_item = &mut build_item;
        Ok(match kind {
            Kind::Switch => TypeHandler::Switch(SwitchType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::Switch(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
            Kind::Option => TypeHandler::Option(OptionType::build(id, params, build_item)?),
            Kind::Array => TypeHandler::Array(ArrayType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::Array(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
            Kind::Container => TypeHandler::Container(ContainerType::build(id, params, build_item)?),
            Kind::Buffer => TypeHandler::Buffer(BufferType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::Buffer(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
            Kind::Bitfield => TypeHandler::Bitfield(BitfieldType::build(id, params)?),
            Kind::Mapper => TypeHandler::Mapper(MapperType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::Mapper(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
            Kind::PString => TypeHandler::PString(PStringType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::PString(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
            Kind::EntityMetadataLoop => TypeHandler::EntityMetadataLoop(EntityMetadataLoopType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::EntityMetadataLoop(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
            Kind::TopBitSetTerminatedArray => {
                TypeHandler::TopBitSetTerminatedArray(TopBitSetTerminatedArrayType::build(
                    id,
                    params,
                    match inherited {
                        Some(TypeHandler::TopBitSetTerminatedArray(t)) => Some(t),
                        _ => None,
                    },
                    build_item,
                )?)
            }
            Kind::ArrayWithLengthOffset => TypeHandler::ArrayWithLengthOffset(ArrayWithLengthOffsetType::build(
                id,
                params,
                match inherited {
                    Some(TypeHandler::ArrayWithLengthOffset(t)) => Some(t),
                    _ => None,
                },
                build_item,
            )?),
        })
    }

    /// Builds and registers every entry of the dictionary not registered yet.
    pub fn register_all(&mut self) -> Result<(), SchemaError> {
        let type_dict = self.type_dict;
        for (name, definition) in type_dict {
            let id = TypeId::scoped(self.scope, name.as_str());
            if self.registry.contains(&id) {
                continue;
            }
            if is_native_marker(definition) {
                if !n::is_native_name(name) {
                    return Err(SchemaError::UnknownNative(id));
                }
                tracing::trace!(%id, "native type");
                continue;
            }
            if definition.is_null() {
                continue;
            }
            let (underlying_id, params) = self.underlying_type_and_params(definition)?;
            self.building.insert(id.clone());
            let built = self.build_handler(&id, &underlying_id, params);
            self.building.remove(&id);
            let handler = built?;
            if self.registry.register_type(id.clone(), handler.clone()) {
                tracing::debug!(%id, kind = handler.kind(), "registered type");
            }
        }
        Ok(())
    }
}

/// Loads one namespace: builds every type of `type_dict` under `scope`.
/// Already registered ids are skipped, so loading twice is a no-op.
pub fn register_types(registry: &mut TypeRegistry, scope: &str, type_dict: &Map<String, Value>) -> Result<(), SchemaError> {
    TypeBuilder::new(registry, scope, type_dict).register_all()
}

/// Walks a protocol document. A `"types"` key holds the dictionary of the
/// current scope; any other object key opens a child scope. Other values
/// are ignored.
///
/// ```
/// use protodef::{TypeId, TypeRegistry};
/// use serde_json::json;
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .load(&json!({
///         "types": { "string": ["pstring", { "countType": "varint" }] },
///         "play": { "toClient": { "types": { "packet_ping": ["container", [{ "name": "id", "type": "i32" }]] } } }
///     }))
///     .unwrap();
/// assert!(registry.contains(&TypeId::native("string")));
/// assert!(registry.contains(&TypeId::scoped("play/toClient", "packet_ping")));
/// ```
pub fn register_types_recursive(registry: &mut TypeRegistry, scope: &str, doc: &Map<String, Value>) -> Result<(), SchemaError> {
    for (key, value) in doc {
        let Value::Object(inner) = value else {
            continue;
        };
        if key == "types" {
            register_types(registry, scope, inner)?;
        } else if scope.is_empty() {
            register_types_recursive(registry, key, inner)?;
        } else {
            register_types_recursive(registry, &format!("{}/{}", scope, key), inner)?;
        }
    }
    Ok(())
}
