//! # Protocol Contract
//!
//! Every traced protocol plugs into the connection tracker by implementing
//! [`Protocol`]: three associated types (frame, record, state) and three
//! functions (boundary finder, frame parser, stitcher). The tracker is generic
//! over the protocol, so the parse and stitch calls are monomorphized; there is
//! no dynamic dispatch on the hot path.
//!
//! ```text
//! bytes ──parse_frame──▶ VecDeque<Frame> ──stitch_frames──▶ Vec<Record>
//!   ▲                          (one per direction)               + error_count
//!   └── find_frame_boundary (only after an Invalid frame)
//! ```

use serde::Serialize;
use std::collections::VecDeque;

/// Whether bytes are parsed as requests or responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageType {
    Request,
    Response,
}

/// Outcome of a single parse attempt, without the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Success,
    /// Buffer holds a prefix of a frame; wait for more captured bytes
    NeedsMoreData,
    /// Bytes at the buffer front cannot start a frame; resynchronize
    Invalid,
}

/// Result of [`Protocol::parse_frame`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<F> {
    Success(F),
    NeedsMoreData,
    Invalid,
}

impl<F> ParseOutcome<F> {
    pub fn state(&self) -> ParseState {
        match self {
            ParseOutcome::Success(_) => ParseState::Success,
            ParseOutcome::NeedsMoreData => ParseState::NeedsMoreData,
            ParseOutcome::Invalid => ParseState::Invalid,
        }
    }
}

/// Common accessors the parse loop and tracker need on every frame
pub trait FrameBase {
    /// Capture timestamp of the frame's first byte
    fn timestamp_ns(&self) -> u64;
    fn set_timestamp_ns(&mut self, timestamp_ns: u64);
    /// Wire size, used for buffer accounting
    fn byte_size(&self) -> usize;
}

/// Per-connection protocol state
///
/// `global` is shared by both directions, `send` and `recv` are scoped to one
/// direction each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnState<G, S, R> {
    pub global: G,
    pub send: S,
    pub recv: R,
}

/// State for protocols that correlate purely by queue order
///
/// Zero-sized, so a tracker holding it allocates nothing.
pub type NoState = ConnState<(), (), ()>;

/// Records produced by one stitch call plus the number of frames discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsWithErrorCount<R> {
    pub records: Vec<R>,
    pub error_count: usize,
}

impl<R> Default for RecordsWithErrorCount<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            error_count: 0,
        }
    }
}

impl<R> RecordsWithErrorCount<R> {
    /// Fold another batch into this one
    pub fn merge(&mut self, other: RecordsWithErrorCount<R>) {
        self.records.extend(other.records);
        self.error_count += other.error_count;
    }
}

/// The contract a protocol implements to be traced
pub trait Protocol {
    type Frame: FrameBase;
    type Record;
    type State: Default;

    /// Name used in logs
    const NAME: &'static str;

    /// Find the next position after `start_pos` that looks like a frame header
    ///
    /// A heuristic scan, only used to resynchronize after an invalid frame.
    /// Returns a position strictly greater than `start_pos`, or `None`.
    fn find_frame_boundary(msg_type: MessageType, buf: &[u8], start_pos: usize) -> Option<usize>;

    /// Parse exactly one frame from the front of `buf`
    ///
    /// On success `buf` is advanced past the frame. On `NeedsMoreData` and
    /// `Invalid` it is left untouched.
    fn parse_frame(msg_type: MessageType, buf: &mut &[u8]) -> ParseOutcome<Self::Frame>;

    /// Match queued requests with queued responses
    ///
    /// Matched frames are removed from both queues. Unmatched responses are
    /// dropped and counted; unmatched requests stay queued for the next call.
    fn stitch_frames(
        requests: &mut VecDeque<Self::Frame>,
        responses: &mut VecDeque<Self::Frame>,
        state: &mut Self::State,
    ) -> RecordsWithErrorCount<Self::Record>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_state_is_zero_sized() {
        assert_eq!(std::mem::size_of::<NoState>(), 0);
    }

    #[test]
    fn test_outcome_state() {
        assert_eq!(ParseOutcome::Success(1u8).state(), ParseState::Success);
        assert_eq!(ParseOutcome::<u8>::NeedsMoreData.state(), ParseState::NeedsMoreData);
        assert_eq!(ParseOutcome::<u8>::Invalid.state(), ParseState::Invalid);
    }
}
