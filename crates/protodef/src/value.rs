//! [`PacketValue`], the dynamic value produced by every type handler.

use base64::Engine;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::nbt::Nbt;

/// Semantic kind of the value a handler decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    Str,
    Bytes,
    Uuid,
    Array,
    Object,
    Nbt,
    /// Depends on the data (switch cases, proxies).
    Any,
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum PacketValue {
    /// `void`, an absent option or an absent optional NBT.
    Null,
    Bool(bool),
    /// Every integer that fits in `i64`.
    Int(i64),
    /// `u64` values.
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Array(Vec<PacketValue>),
    /// Container fields in wire order.
    Object(IndexMap<String, PacketValue>),
    Nbt(Box<Nbt>),
}

impl PacketValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
            Self::Nbt(_) => ValueKind::Nbt,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view used for lengths and counts.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, PacketValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a field of an object value.
    pub fn get(&self, key: &str) -> Option<&PacketValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// The string a switch compares against its case keys, and the key a
    /// mapper looks its raw value up by.
    ///
    /// Booleans become `true`/`false`, integers their decimal form, floats
    /// their shortest round-trip form and strings themselves.
    pub fn switch_key(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(v) => v.to_string(),
            Self::UInt(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Str(s) => s.clone(),
            Self::Uuid(u) => u.hyphenated().to_string(),
            other => serde_json::Value::from(other.clone()).to_string(),
        }
    }
}

impl From<PacketValue> for serde_json::Value {
    fn from(v: PacketValue) -> Self {
        use serde_json::{json, Value};
        match v {
            PacketValue::Null => Value::Null,
            PacketValue::Bool(b) => Value::Bool(b),
            PacketValue::Int(i) => json!(i),
            PacketValue::UInt(u) => json!(u),
            PacketValue::Float(f) => json!(f),
            PacketValue::Str(s) => Value::String(s),
            PacketValue::Bytes(b) => {
                let b64 = base64::engine::general_purpose::STANDARD.encode(&b);
                Value::String(format!("data:application/octet-stream;base64,{}", b64))
            }
            PacketValue::Uuid(u) => Value::String(u.hyphenated().to_string()),
            PacketValue::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            PacketValue::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            PacketValue::Nbt(nbt) => {
                let nbt = *nbt;
                match nbt.name {
                    Some(name) => json!({ "name": name, "value": Value::from(nbt.tag) }),
                    None => Value::from(nbt.tag),
                }
            }
        }
    }
}
