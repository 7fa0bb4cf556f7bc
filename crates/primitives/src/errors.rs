//! Errors during parsing/handling/conversion of primitives.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
