//! Switches and options.

use std::sync::Arc;

use indexmap::IndexMap;
use protodef_buffers::Reader;
use serde_json::Value;

use super::{build_param, json_kind, param_object, BuildItem, TypeHandler};
use crate::error::{DecodeError, SchemaError};
use crate::record::PacketRecord;
use crate::registry::TypeRegistry;
use crate::type_id::{self as n, TypeId};
use crate::value::PacketValue;

/// What a switch compares its case keys against.
#[derive(Debug, Clone, PartialEq)]
pub enum Discriminant {
    /// A previously decoded field, relative to the enclosing container.
    Field(String),
    /// A constant key from `compareToValue`.
    Value(String),
}

/// Picks a case handler from a previously decoded value.
#[derive(Debug, Clone)]
pub struct SwitchType {
    pub id: TypeId,
    pub compare_to: Discriminant,
    pub cases: IndexMap<String, Arc<TypeHandler>>,
    pub default: Option<Arc<TypeHandler>>,
}

impl SwitchType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&SwitchType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let params = param_object(n::SWITCH, params)?;
        let compare_to = match params.and_then(|p| p.get("compareTo")) {
            Some(Value::String(field)) => Some(Discriminant::Field(field.clone())),
            Some(other) => {
                return Err(SchemaError::invalid(
                    n::SWITCH,
                    "compareTo",
                    format!("expected a field reference, found {}", json_kind(other)),
                ))
            }
            None => match params.and_then(|p| p.get("compareToValue")) {
                Some(Value::String(s)) => Some(Discriminant::Value(s.clone())),
                Some(v @ (Value::Number(_) | Value::Bool(_))) => {
                    Some(Discriminant::Value(v.to_string()))
                }
                Some(other) => {
                    return Err(SchemaError::invalid(
                        n::SWITCH,
                        "compareToValue",
                        format!("expected a scalar, found {}", json_kind(other)),
                    ))
                }
                None => None,
            },
        };
        let compare_to = compare_to
            .or_else(|| inherited.map(|p| p.compare_to.clone()))
            .ok_or(SchemaError::MissingParam { kind: n::SWITCH, key: "compareTo" })?;

        let cases = match params.and_then(|p| p.get("fields")) {
            Some(Value::Object(fields)) => {
                let mut cases = IndexMap::with_capacity(fields.len());
                for (key, token) in fields {
                    cases.insert(key.clone(), build_item(token)?);
                }
                cases
            }
            Some(other) => {
                return Err(SchemaError::invalid(
                    n::SWITCH,
                    "fields",
                    format!("expected an object, found {}", json_kind(other)),
                ))
            }
            None => inherited
                .map(|p| p.cases.clone())
                .ok_or(SchemaError::MissingParam { kind: n::SWITCH, key: "fields" })?,
        };

        let default = match build_param(params, "default", build_item)? {
            Some(handler) => Some(handler),
            None => inherited.and_then(|p| p.default.clone()),
        };

        Ok(Self {
            id,
            compare_to,
            cases,
            default,
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
        let key = match &self.compare_to {
            Discriminant::Field(field) => rec.get_entry_value(parent_path, field)?.switch_key(),
            Discriminant::Value(key) => key.clone(),
        };
        let handler = match self.cases.get(&key).or(self.default.as_ref()) {
            Some(handler) => handler,
            None => {
                let compare_to = match &self.compare_to {
                    Discriminant::Field(field) => field.clone(),
                    Discriminant::Value(_) => "compareToValue".to_string(),
                };
                return Err(DecodeError::UnmatchedSwitchCase { compare_to, key });
            }
        };
        tracing::trace!(path, key = %key, case = %handler.type_id(), "switch case selected");
        handler.read_value(registry, rec, parent_path, path, reader)
    }
}

/// A presence byte, then the wrapped value when it is non-zero.
#[derive(Debug, Clone)]
pub struct OptionType {
    pub id: TypeId,
    pub item: Arc<TypeHandler>,
}

impl OptionType {
    /// The params are the wrapped type itself, e.g. `["option", "varint"]`.
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let token = match params {
            None | Some(Value::Null) => {
                return Err(SchemaError::MissingParam { kind: n::OPTION, key: "type" })
            }
            Some(token) => token,
        };
        Ok(Self {
            id,
            item: build_item(token)?,
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
        if reader.u8()? == 0 {
            return Ok(PacketValue::Null);
        }
        self.item.read_value(registry, rec, parent_path, path, reader)
    }
}
