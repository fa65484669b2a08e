//! Qualified type identifiers and the native type table.

use std::fmt;

/// Conditional kinds.
pub const SWITCH: &str = "switch";
pub const OPTION: &str = "option";

/// Numeric kinds.
pub const VARINT: &str = "varint";
pub const VARLONG: &str = "varlong";
pub const I8: &str = "i8";
pub const I16: &str = "i16";
pub const I32: &str = "i32";
pub const I64: &str = "i64";
pub const U8: &str = "u8";
pub const U16: &str = "u16";
pub const U32: &str = "u32";
pub const U64: &str = "u64";
pub const F32: &str = "f32";
pub const F64: &str = "f64";
pub const LI8: &str = "li8";
pub const LI16: &str = "li16";
pub const LI32: &str = "li32";
pub const LI64: &str = "li64";
pub const LU8: &str = "lu8";
pub const LU16: &str = "lu16";
pub const LU32: &str = "lu32";
pub const LU64: &str = "lu64";
pub const LF32: &str = "lf32";
pub const LF64: &str = "lf64";

/// Primitive kinds.
pub const BOOL: &str = "bool";
pub const VOID: &str = "void";

/// Structure kinds.
pub const ARRAY: &str = "array";
pub const CONTAINER: &str = "container";

/// Utility kinds.
pub const BUFFER: &str = "buffer";
pub const BITFIELD: &str = "bitfield";
pub const MAPPER: &str = "mapper";
pub const PSTRING: &str = "pstring";

/// Minecraft extensions.
pub const UUID: &str = "UUID";
pub const ENTITY_METADATA_LOOP: &str = "entityMetadataLoop";
pub const TOP_BIT_SET_TERMINATED_ARRAY: &str = "topBitSetTerminatedArray";
pub const REST_BUFFER: &str = "restBuffer";
pub const NBT: &str = "nbt";
pub const OPTIONAL_NBT: &str = "optionalNbt";
pub const ANONYMOUS_NBT: &str = "anonymousNbt";
pub const ANON_OPTIONAL_NBT: &str = "anonOptionalNbt";
pub const ARRAY_WITH_LENGTH_OFFSET: &str = "arrayWithLengthOffset";

/// Native kinds that carry no handler of their own. They only mark the
/// underlying kind of a parameterized definition.
pub const PLACEHOLDER_NAMES: [&str; 11] = [
    SWITCH,
    OPTION,
    ARRAY,
    CONTAINER,
    BUFFER,
    BITFIELD,
    MAPPER,
    PSTRING,
    ENTITY_METADATA_LOOP,
    TOP_BIT_SET_TERMINATED_ARRAY,
    ARRAY_WITH_LENGTH_OFFSET,
];

/// Every native type name, placeholders included.
pub const NATIVE_NAMES: [&str; 41] = [
    SWITCH,
    OPTION,
    VARINT,
    VARLONG,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    LI8,
    LI16,
    LI32,
    LI64,
    LU8,
    LU16,
    LU32,
    LU64,
    LF32,
    LF64,
    BOOL,
    VOID,
    ARRAY,
    CONTAINER,
    BUFFER,
    BITFIELD,
    MAPPER,
    PSTRING,
    UUID,
    ENTITY_METADATA_LOOP,
    TOP_BIT_SET_TERMINATED_ARRAY,
    REST_BUFFER,
    NBT,
    OPTIONAL_NBT,
    ANONYMOUS_NBT,
    ANON_OPTIONAL_NBT,
    ARRAY_WITH_LENGTH_OFFSET,
];

pub fn is_native_name(name: &str) -> bool {
    NATIVE_NAMES.contains(&name)
}

pub fn is_placeholder_name(name: &str) -> bool {
    PLACEHOLDER_NAMES.contains(&name)
}

/// A `(scope, name)` pair naming a type.
///
/// The scope is a slash-delimited namespace path such as `play/toClient`;
/// the empty scope is the global namespace where native types live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId {
    scope: String,
    name: String,
}

impl TypeId {
    /// An id in the given scope. An empty scope means global.
    pub fn scoped(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// An id in the global namespace.
    pub fn native(name: impl Into<String>) -> Self {
        Self::scoped(String::new(), name)
    }

    /// Parses the display form: `name` or `scope:name`.
    ///
    /// ```
    /// use protodef::TypeId;
    ///
    /// let id = TypeId::parse("play/toClient:packet");
    /// assert_eq!(id.scope(), "play/toClient");
    /// assert_eq!(id.name(), "packet");
    /// assert_eq!(TypeId::parse("varint"), TypeId::native("varint"));
    /// ```
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once(':') {
            Some((scope, name)) => Self::scoped(scope, name),
            None => Self::native(text),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_empty()
    }

    /// True for global ids whose name is one of the native kinds.
    pub fn is_native(&self) -> bool {
        self.is_global() && is_native_name(&self.name)
    }

    /// True for native kinds that have no concrete handler.
    pub fn is_placeholder(&self) -> bool {
        self.is_global() && is_placeholder_name(&self.name)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.scope, self.name)
        }
    }
}
