//! Per-packet store of decoded values keyed by absolute path.

use indexmap::IndexMap;

use crate::error::DecodeError;
use crate::type_id::TypeId;
use crate::value::PacketValue;

/// Resolves `entry_name` against `parent_path`.
///
/// - `/x` is absolute from the record root and ignores `parent_path`.
/// - every leading `../` drops the last segment of `parent_path`.
/// - anything else is joined below `parent_path`.
///
/// ```
/// use protodef::get_absolute_path;
///
/// assert_eq!(get_absolute_path("a/b", "../c"), "a/c");
/// assert_eq!(get_absolute_path("a/b", "/d"), "d");
/// assert_eq!(get_absolute_path("", "x"), "x");
/// ```
pub fn get_absolute_path(parent_path: &str, entry_name: &str) -> String {
    if let Some(absolute) = entry_name.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parent = parent_path;
    let mut name = entry_name;
    while let Some(rest) = name.strip_prefix("../") {
        name = rest;
        parent = parent_of(parent);
    }
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Drops the last `/` segment of `path`.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub value: PacketValue,
    pub type_id: TypeId,
}

/// Path-keyed values decoded so far for one packet.
///
/// Switches and length references read sibling values back out of it.
#[derive(Debug, Clone, Default)]
pub struct PacketRecord {
    entries: IndexMap<String, RecordEntry>,
    protocol_version: Option<i32>,
    /// Recursive type references currently being decoded.
    depth: usize,
}

impl PacketRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record tagged with the protocol version the packet was read under.
    pub fn with_protocol_version(protocol_version: i32) -> Self {
        Self {
            protocol_version: Some(protocol_version),
            ..Self::default()
        }
    }

    pub fn protocol_version(&self) -> Option<i32> {
        self.protocol_version
    }

    /// Enters one more level of recursive type reference.
    pub(crate) fn enter(&mut self, limit: usize) -> Result<(), DecodeError> {
        if self.depth >= limit {
            return Err(DecodeError::TooDeep(limit));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Stores `value` at `path`. Paths are written once; a repeated write
    /// is ignored and returns `false`.
    pub fn write_entry(&mut self, path: &str, value: PacketValue, type_id: TypeId) -> bool {
        if self.entries.contains_key(path) {
            tracing::warn!(path, %type_id, "record entry already written, keeping the first value");
            return false;
        }
        self.entries
            .insert(path.to_string(), RecordEntry { value, type_id });
        true
    }

    pub fn try_get_entry(&self, parent_path: &str, entry_name: &str) -> Option<&RecordEntry> {
        self.entries.get(&get_absolute_path(parent_path, entry_name))
    }

    pub fn try_get_entry_value(&self, parent_path: &str, entry_name: &str) -> Option<&PacketValue> {
        self.try_get_entry(parent_path, entry_name).map(|e| &e.value)
    }

    pub fn try_get_entry_type(&self, parent_path: &str, entry_name: &str) -> Option<&TypeId> {
        self.try_get_entry(parent_path, entry_name).map(|e| &e.type_id)
    }

    /// Like [`try_get_entry_value`](Self::try_get_entry_value), failing when
    /// nothing was written at the resolved path.
    pub fn get_entry_value(
        &self,
        parent_path: &str,
        entry_name: &str,
    ) -> Result<&PacketValue, DecodeError> {
        let path = get_absolute_path(parent_path, entry_name);
        self.entries
            .get(&path)
            .map(|e| &e.value)
            .ok_or(DecodeError::MissingRecordEntry { path })
    }

    /// Entries in the order they were decoded.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RecordEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{ path: value }` in decode order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, e)| (k.clone(), serde_json::Value::from(e.value.clone())))
                .collect(),
        )
    }
}
