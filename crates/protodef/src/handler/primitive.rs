use protodef_buffers::Reader;

use crate::error::DecodeError;
use crate::type_id::{self as n, TypeId};
use crate::value::PacketValue;

/// One byte; anything but zero is `true`.
#[derive(Debug, Clone)]
pub struct BoolType {
    pub id: TypeId,
}

impl BoolType {
    pub fn new() -> Self {
        Self {
            id: TypeId::native(n::BOOL),
        }
    }

    pub(crate) fn read_value(&self, reader: &mut Reader<'_>) -> Result<PacketValue, DecodeError> {
        Ok(PacketValue::Bool(reader.u8()? != 0))
    }
}

impl Default for BoolType {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero bytes, decodes to null.
#[derive(Debug, Clone)]
pub struct VoidType {
    pub id: TypeId,
}

impl VoidType {
    pub fn new() -> Self {
        Self {
            id: TypeId::native(n::VOID),
        }
    }

    pub(crate) fn read_value(&self) -> PacketValue {
        PacketValue::Null
    }
}

impl Default for VoidType {
    fn default() -> Self {
        Self::new()
    }
}
