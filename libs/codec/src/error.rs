//! Decoding errors for captured wire data
//!
//! Every extraction on [`TypeDecoder`](crate::TypeDecoder) either succeeds or
//! fails with one of these variants. Failures never move the cursor, so the
//! caller can decide whether to wait for more bytes or give up on the frame.

use thiserror::Error;

/// Wire type decoding errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the field requires
    #[error("Insufficient data: need {need} bytes, got {got} (context: {context})")]
    InsufficientData {
        need: usize,
        got: usize,
        context: &'static str,
    },

    /// Bytes are present but describe something impossible for the protocol
    #[error("Malformed data at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}

impl DecodeError {
    /// Create InsufficientData error with the field being decoded as context
    pub fn insufficient_data(need: usize, got: usize, context: &'static str) -> Self {
        Self::InsufficientData { need, got, context }
    }

    /// Create Malformed error at a buffer offset
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// True when waiting for more bytes could turn this failure into a success
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

/// Result type for decoding operations
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
