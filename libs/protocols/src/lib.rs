//! # Wiretap Protocols
//!
//! ## Purpose
//!
//! Turns captured connection bytes into request/response records. Each
//! supported protocol implements [`Protocol`]; everything else here is generic
//! over it.
//!
//! ## Architecture Role
//!
//! ```text
//! captured chunks ──▶ TrackerRegistry ──▶ ConnTracker (per connection)
//!                                            ├── DataStream ×2 ──parse_frames──▶ frame queues
//!                                            └── Protocol::stitch_frames ──▶ records
//! ```
//!
//! Wire-level notations (strings, maps, options, query parameters) are decoded
//! by `wiretap_codec`.
//!
//! ## Failure Model
//!
//! Captures start mid-stream and lose packets, so malformed input is routine.
//! Nothing in the parse or stitch path returns an error: bad frames are
//! skipped by resynchronizing and reported as counts alongside the records.

pub mod config;
pub mod cql;
pub mod data_stream;
pub mod error;
pub mod interface;
pub mod parse;
pub mod registry;
pub mod stitch;
pub mod tracker;

pub use config::TrackerConfig;
pub use data_stream::DataStream;
pub use error::{ConfigError, ConfigResult};
pub use interface::{
    ConnState, FrameBase, MessageType, NoState, ParseOutcome, ParseState, Protocol,
    RecordsWithErrorCount,
};
pub use parse::{parse_frames, queued_bytes, ParseSummary};
pub use registry::{ConnRecord, RegistryStats, TrackerRegistry};
pub use stitch::stitch_fifo;
pub use tracker::{ConnTracker, Role, TrackerStats, TrafficDirection};
