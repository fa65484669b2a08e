//! Runtime interpreter for ProtoDef schemas.
//!
//! A [`TypeRegistry`] is loaded from a JSON protocol document (as published
//! by minecraft-data) and then decodes packets of any type it knows, with no
//! per-packet generated code:
//!
//! ```
//! use protodef::{PacketValue, TypeId, TypeRegistry};
//! use serde_json::json;
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .load(&json!({
//!         "types": {
//!             "packet": ["container", [
//!                 { "name": "a", "type": "u8" },
//!                 { "name": "b", "type": "varint" },
//!                 { "name": "c", "type": "bool" }
//!             ]]
//!         }
//!     }))
//!     .unwrap();
//!
//! let packet = registry.decode(&TypeId::native("packet"), &[0x05, 0x0a, 0x01]).unwrap();
//! assert_eq!(packet.value.get("b"), Some(&PacketValue::Int(10)));
//! assert_eq!(packet.record.try_get_entry_value("", "c"), Some(&PacketValue::Bool(true)));
//! assert_eq!(packet.consumed, 3);
//! ```

pub mod builder;
pub mod cli;
pub mod error;
pub mod handler;
pub mod nbt;
mod options;
pub mod record;
pub mod registry;
pub mod type_id;
mod value;

pub use builder::TypeBuilder;
pub use error::{DecodeError, LookupError, SchemaError};
pub use handler::TypeHandler;
pub use nbt::{Nbt, NbtTag};
pub use options::DecoderOptions;
pub use record::{get_absolute_path, PacketRecord, RecordEntry};
pub use registry::{DecodedPacket, TypeRegistry};
pub use type_id::TypeId;
pub use value::{PacketValue, ValueKind};

pub use protodef_buffers::{BufferError, Reader};
