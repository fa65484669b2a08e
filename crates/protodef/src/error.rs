//! Error types for schema loading, registry lookups and decoding.

use protodef_buffers::BufferError;
use thiserror::Error;

use crate::type_id::TypeId;

/// Raised while loading a schema document. Always fatal for the load.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("type {name} is defined in neither local nor parent namespaces of {scope:?}, and is not a native type either")]
    UndefinedType { scope: String, name: String },
    #[error("underlying type {underlying} (used by {custom}) is not loaded, and is not present in declared type list")]
    MissingDependency { custom: TypeId, underlying: TypeId },
    #[error("type {0} depends on itself through its underlying types")]
    CyclicDefinition(TypeId),
    #[error("type {0} is declared native but the decoder does not provide it")]
    UnknownNative(TypeId),
    #[error("type definition should not be {found}")]
    MalformedDefinition { found: &'static str },
    #[error("{kind} is missing required parameter `{key}`")]
    MissingParam { kind: &'static str, key: &'static str },
    #[error("{kind} parameter `{key}` is invalid: {reason}")]
    InvalidParam {
        kind: &'static str,
        key: &'static str,
        reason: String,
    },
    #[error("invalid schema JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl SchemaError {
    pub(crate) fn invalid(kind: &'static str, key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            kind,
            key,
            reason: reason.into(),
        }
    }
}

/// Raised by registry lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("type {0} is not registered")]
    Unknown(TypeId),
    #[error("handler for type {0} is a native placeholder and shouldn't be taken from the registry")]
    Placeholder(TypeId),
}

/// Raised while decoding a packet. Never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("no switch case matches {key:?} (compared to {compare_to}) and no default is declared")]
    UnmatchedSwitchCase { compare_to: String, key: String },
    #[error("mapper has no entry for value {0}")]
    UnmappedValue(String),
    #[error("negative length {0}")]
    NegativeLength(i64),
    #[error("length {length} exceeds the limit of {limit}")]
    LengthTooLarge { length: usize, limit: usize },
    #[error("length field at {path} is not an integer")]
    NonIntegerLength { path: String },
    #[error("no record entry at path {path:?}")]
    MissingRecordEntry { path: String },
    #[error("invalid NBT tag id {0}")]
    InvalidNbtTag(u8),
    #[error("NBT nesting exceeds depth {0}")]
    NbtTooDeep(usize),
    #[error("recursive types nest deeper than {0}")]
    TooDeep(usize),
}
