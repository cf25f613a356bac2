//! # Error Types
//!
//! Errors raised while parsing the shared identifiers.

use thiserror::Error;

/// Errors that can occur when decoding an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The string does not start with the required prefix.
    #[error("Missing prefix: expected {expected:?} in {input:?}")]
    MissingPrefix { expected: &'static str, input: String },

    /// The payload is not valid base58.
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),

    /// The payload is too short to carry a checksum.
    #[error("Missing checksum")]
    MissingChecksum,

    /// The trailing checksum does not match the payload.
    #[error("Checksum mismatch")]
    BadChecksum,

    /// The payload is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded payload has the wrong width.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
