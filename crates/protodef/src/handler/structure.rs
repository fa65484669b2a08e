//! Arrays and containers.

use std::sync::Arc;

use indexmap::IndexMap;
use protodef_buffers::Reader;
use serde_json::Value;

use super::{element_path, json_kind, param_array, param_object, to_element_count, BuildItem, CountSource, TypeHandler};
use crate::error::{DecodeError, SchemaError};
use crate::record::{get_absolute_path, PacketRecord};
use crate::registry::TypeRegistry;
use crate::type_id::{self as n, TypeId};
use crate::value::PacketValue;

/// `count` elements of one item type.
#[derive(Debug, Clone)]
pub struct ArrayType {
    pub id: TypeId,
    pub item: Arc<TypeHandler>,
    pub count: CountSource,
}

impl ArrayType {
    /// Params: `type`, plus one of `count` (literal or field reference) or
    /// `countType`. Anything omitted is taken from `inherited`.
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        inherited: Option<&ArrayType>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let params = param_object(n::ARRAY, params)?;
        let item = match params.and_then(|p| p.get("type")) {
            Some(token) => build_item(token)?,
            None => inherited
                .map(|p| p.item.clone())
                .ok_or(SchemaError::MissingParam { kind: n::ARRAY, key: "type" })?,
        };
        let count = match CountSource::from_params(n::ARRAY, params, build_item)? {
            Some(count) => count,
            None => inherited
                .map(|p| p.count.clone())
                .ok_or(SchemaError::MissingParam { kind: n::ARRAY, key: "countType" })?,
        };
        Ok(Self { id, item, count })
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
        let count = to_element_count(raw, registry)?;
        read_elements(&self.item, count, registry, rec, parent_path, path, reader)
    }
}

pub(crate) fn read_elements(
    item: &TypeHandler,
    count: usize,
    registry: &TypeRegistry,
    rec: &mut PacketRecord,
    parent_path: &str,
    path: &str,
    reader: &mut Reader<'_>,
) -> Result<PacketValue, DecodeError> {
    let mut out = Vec::with_capacity(count.min(reader.size()));
    for i in 0..count {
        out.push(item.read_value(registry, rec, parent_path, &element_path(path, i), reader)?);
    }
    Ok(PacketValue::Array(out))
}

#[derive(Debug, Clone)]
pub struct ContainerField {
    /// `None` for anonymous fields.
    pub name: Option<String>,
    pub handler: Arc<TypeHandler>,
}

/// Ordered fields decoded back to back.
///
/// Named fields are written to the record as they are decoded, so later
/// fields can refer to earlier ones. An anonymous field is decoded in the
/// container's own namespace: an object result is merged into the
/// container, a null result is dropped and anything else is kept under
/// `anon<index>`.
#[derive(Debug, Clone)]
pub struct ContainerType {
    pub id: TypeId,
    pub fields: Vec<ContainerField>,
}

impl ContainerType {
    pub fn build<'a>(
        id: TypeId,
        params: Option<&'a Value>,
        build_item: &mut BuildItem<'_, 'a>,
    ) -> Result<Self, SchemaError> {
        let entries = param_array(n::CONTAINER, params)?;
        let mut fields = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Object(entry) = entry else {
                return Err(SchemaError::invalid(
                    n::CONTAINER,
                    "params",
                    format!("field must be an object, found {}", json_kind(entry)),
                ));
            };
            let token = entry
                .get("type")
                .ok_or(SchemaError::MissingParam { kind: n::CONTAINER, key: "type" })?;
            let anon = entry.get("anon").and_then(Value::as_bool).unwrap_or(false);
            let name = match entry.get("name") {
                _ if anon => None,
                Some(Value::String(name)) => Some(name.clone()),
                Some(other) => {
                    return Err(SchemaError::invalid(
                        n::CONTAINER,
                        "name",
                        format!("expected a string, found {}", json_kind(other)),
                    ))
                }
                None => None,
            };
            fields.push(ContainerField {
                name,
                handler: build_item(token)?,
            });
        }
        Ok(Self { id, fields })
    }

    pub(crate) fn read_value(
        &self,
        registry: &TypeRegistry,
        rec: &mut PacketRecord,
        path: &str,
        reader: &mut Reader<'_>,
    ) -> Result<PacketValue, DecodeError> {
        let mut out = IndexMap::with_capacity(self.fields.len());
        for (index, field) in self.fields.iter().enumerate() {
            let type_id = field.handler.type_id();
            match &field.name {
                Some(name) => {
                    let child = get_absolute_path(path, name);
                    let value = field.handler.read_value(registry, rec, path, &child, reader)?;
                    rec.write_entry(&child, value.clone(), type_id.clone());
                    out.insert(name.clone(), value);
                }
                None => match field.handler.read_value(registry, rec, path, path, reader)? {
                    PacketValue::Object(map) => out.extend(map),
                    PacketValue::Null => {}
                    value => {
                        let name = format!("anon{}", index);
                        rec.write_entry(&get_absolute_path(path, &name), value.clone(), type_id.clone());
                        out.insert(name, value);
                    }
                },
            }
        }
        Ok(PacketValue::Object(out))
    }
}
