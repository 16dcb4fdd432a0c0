//! # Wiretap Codec - Captured Wire Type Decoding
//!
//! ## Purpose
//!
//! Bounds-checked decoding of the CQL native protocol notations found in frame
//! bodies captured off live connections. This is the bottom layer of the
//! wiretap stack: it knows nothing about frames, directions or connections,
//! only how to turn bytes into typed values without ever reading out of bounds.
//!
//! ## Architecture Role
//!
//! ```text
//! [codec] → protocols/ → services/
//!    ↑          ↓            ↓
//! TypeDecoder  Frames,     Replay and
//! Wire types   Stitching   Export
//! ```
//!
//! ## What This Crate Contains
//! - [`TypeDecoder`]: cursor with one extraction per wire notation
//! - Composite value types: [`QueryParameters`], [`ResultMetadata`], [`TypeOption`]
//! - [`DecodeError`]: `InsufficientData` for truncated input, `Malformed` for impossible input
//!
//! ## What This Crate Does NOT Contain
//! - Frame headers, parsing loops or request/response matching (belongs in protocols/)
//! - Any I/O

pub mod decoder;
pub mod error;
pub mod types;

pub use decoder::{TypeDecoder, MAX_OPTION_DEPTH};
pub use error::{DecodeError, DecodeResult};
pub use types::{
    metadata_flags, query_flags, ColSpec, DataType, QueryParameters, ResultMetadata, TypeOption,
};
