//! Fixed-width and variable-length numbers.

use protodef_buffers::{BufferError, Reader};

use crate::error::DecodeError;
use crate::type_id::{self as n, TypeId};
use crate::value::{PacketValue, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
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
    VarInt,
    VarLong,
    Li8,
    Li16,
    Li32,
    Li64,
    Lu8,
    Lu16,
    Lu32,
    Lu64,
    Lf32,
    Lf64,
}

impl NumericKind {
    pub const ALL: [NumericKind; 22] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::VarInt,
        Self::VarLong,
        Self::Li8,
        Self::Li16,
        Self::Li32,
        Self::Li64,
        Self::Lu8,
        Self::Lu16,
        Self::Lu32,
        Self::Lu64,
        Self::Lf32,
        Self::Lf64,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => n::I8,
            Self::I16 => n::I16,
            Self::I32 => n::I32,
            Self::I64 => n::I64,
            Self::U8 => n::U8,
            Self::U16 => n::U16,
            Self::U32 => n::U32,
            Self::U64 => n::U64,
            Self::F32 => n::F32,
            Self::F64 => n::F64,
            Self::VarInt => n::VARINT,
            Self::VarLong => n::VARLONG,
            Self::Li8 => n::LI8,
            Self::Li16 => n::LI16,
            Self::Li32 => n::LI32,
            Self::Li64 => n::LI64,
            Self::Lu8 => n::LU8,
            Self::Lu16 => n::LU16,
            Self::Lu32 => n::LU32,
            Self::Lu64 => n::LU64,
            Self::Lf32 => n::LF32,
            Self::Lf64 => n::LF64,
        }
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::U64 | Self::Lu64 => ValueKind::UInt,
            Self::F32 | Self::F64 | Self::Lf32 | Self::Lf64 => ValueKind::Float,
            _ => ValueKind::Int,
        }
    }

    /// Reads one number. Big-endian unless the name starts with `l`.
    pub fn read(self, reader: &mut Reader<'_>) -> Result<PacketValue, BufferError> {
        Ok(match self {
            Self::I8 | Self::Li8 => PacketValue::Int(reader.i8()? as i64),
            Self::U8 | Self::Lu8 => PacketValue::Int(reader.u8()? as i64),
            Self::I16 => PacketValue::Int(reader.i16()? as i64),
            Self::U16 => PacketValue::Int(reader.u16()? as i64),
            Self::I32 => PacketValue::Int(reader.i32()? as i64),
            Self::U32 => PacketValue::Int(reader.u32()? as i64),
            Self::I64 => PacketValue::Int(reader.i64()?),
            Self::U64 => PacketValue::UInt(reader.u64()?),
            Self::F32 => PacketValue::Float(reader.f32()? as f64),
            Self::F64 => PacketValue::Float(reader.f64()?),
            Self::Li16 => PacketValue::Int(reader.i16_le()? as i64),
            Self::Lu16 => PacketValue::Int(reader.u16_le()? as i64),
            Self::Li32 => PacketValue::Int(reader.i32_le()? as i64),
            Self::Lu32 => PacketValue::Int(reader.u32_le()? as i64),
            Self::Li64 => PacketValue::Int(reader.i64_le()?),
            Self::Lu64 => PacketValue::UInt(reader.u64_le()?),
            Self::Lf32 => PacketValue::Float(reader.f32_le()? as f64),
            Self::Lf64 => PacketValue::Float(reader.f64_le()?),
            Self::VarInt => PacketValue::Int(reader.varint()? as i64),
            Self::VarLong => PacketValue::Int(reader.varlong()?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct NumericType {
    pub id: TypeId,
    pub kind: NumericKind,
}

impl NumericType {
    pub fn new(kind: NumericKind) -> Self {
        Self {
            id: TypeId::native(kind.name()),
            kind,
        }
    }

    pub(crate) fn read_value(&self, reader: &mut Reader<'_>) -> Result<PacketValue, DecodeError> {
        Ok(self.kind.read(reader)?)
    }
}
