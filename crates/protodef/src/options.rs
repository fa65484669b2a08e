//! Decoder limits.

use serde::Deserialize;

/// Limits applied while decoding. Loaded from JSON with camelCase keys:
///
/// ```
/// use protodef::DecoderOptions;
///
/// let opts: DecoderOptions = serde_json::from_str(r#"{ "maxArrayLength": 1024 }"#).unwrap();
/// assert_eq!(opts.max_array_length, 1024);
/// assert_eq!(opts.max_nbt_depth, 512);
/// assert_eq!(opts.max_depth, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderOptions {
    /// Largest element count any array-like type accepts.
    pub max_array_length: usize,
    /// Deepest NBT nesting accepted.
    pub max_nbt_depth: usize,
    /// Deepest chain of recursive type references one decode may follow.
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_array_length: 0xFF_FFFF,
            max_nbt_depth: 512,
            max_depth: 256,
        }
    }
}

impl DecoderOptions {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
