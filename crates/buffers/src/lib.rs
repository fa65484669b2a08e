//! Byte cursor used by the ProtoDef runtime decoder.
//!
//! Every read is bounds-checked: running past the end yields
//! [`BufferError::EndOfBuffer`] and leaves the cursor where it was.

mod reader;

pub use reader::Reader;

use thiserror::Error;

/// Errors raised while reading from a [`Reader`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("variable-length integer is too long")]
    VarIntTooLong,
}
