//! Core logic of the `protodef-decode` binary.

use std::fmt;

use crate::error::{DecodeError, SchemaError};
use crate::options::DecoderOptions;
use crate::record::PacketRecord;
use crate::registry::TypeRegistry;
use crate::type_id::TypeId;
use protodef_buffers::Reader;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Schema(SchemaError),
    Hex(hex::FromHexError),
    Decode(DecodeError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(e)   => write!(f, "{e}"),
            CliError::Io(e)      => write!(f, "{e}"),
            CliError::Json(e)    => write!(f, "{e}"),
            CliError::Schema(e)  => write!(f, "{e}"),
            CliError::Hex(e)     => write!(f, "invalid hex input: {e}"),
            CliError::Decode(e)  => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self { CliError::Io(e) }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self { CliError::Schema(e) }
}

impl From<DecodeError> for CliError {
    fn from(e: DecodeError) -> Self { CliError::Decode(e) }
}

impl From<hex::FromHexError> for CliError {
    fn from(e: hex::FromHexError) -> Self { CliError::Hex(e) }
}

// ── Input ─────────────────────────────────────────────────────────────────

/// Reads a schema or options file; the error names the path.
pub fn read_file(path: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(std::io::Error::new(e.kind(), format!("{path}: {e}"))))
}

/// Hex text to bytes. Whitespace is ignored so dumps can be pasted as is.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(compact)?)
}

pub fn parse_options(text: &str) -> Result<DecoderOptions, CliError> {
    DecoderOptions::from_json_str(text).map_err(CliError::Json)
}

// ── Decode ────────────────────────────────────────────────────────────────

/// Loads `schema`, decodes `body` as `root` and renders the value as pretty
/// JSON.
pub fn decode_to_json(
    schema: &str,
    root: &str,
    body: &[u8],
    options: DecoderOptions,
    protocol_version: Option<i32>,
) -> Result<String, CliError> {
    let mut registry = TypeRegistry::with_options(options);
    registry.load_str(schema)?;
    let record = match protocol_version {
        Some(v) => PacketRecord::with_protocol_version(v),
        None => PacketRecord::new(),
    };
    let mut reader = Reader::new(body);
    let packet = registry.decode_with_record(&TypeId::parse(root), record, &mut reader)?;
    let json = serde_json::Value::from(packet.value);
    serde_json::to_string_pretty(&json).map_err(CliError::Json)
}
