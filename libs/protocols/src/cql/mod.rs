//! # CQL Native Protocol (v3/v4)
//!
//! Cassandra's binary protocol: 9-byte frame headers, stream-id correlation and
//! the notations decoded by [`wiretap_codec::TypeDecoder`]. Flag layouts follow
//! protocol v4; v5 segment framing and body compression are not decoded.

pub mod body;
pub mod frame;
pub mod parse;
pub mod stitcher;
pub mod types;

pub use frame::{Frame, FrameHeader, Opcode, HEADER_LENGTH, MAX_BODY_BYTES};
pub use types::{PreparedCache, Record, Request, Response, State};

use crate::interface::{MessageType, ParseOutcome, Protocol, RecordsWithErrorCount};
use std::collections::VecDeque;

/// Protocol marker for CQL traffic
#[derive(Debug, Clone, Copy, Default)]
pub struct Cql;

impl Protocol for Cql {
    type Frame = Frame;
    type Record = Record;
    type State = State;

    const NAME: &'static str = "cql";

    fn find_frame_boundary(msg_type: MessageType, buf: &[u8], start_pos: usize) -> Option<usize> {
        parse::find_frame_boundary(msg_type, buf, start_pos)
    }

    fn parse_frame(msg_type: MessageType, buf: &mut &[u8]) -> ParseOutcome<Frame> {
        parse::parse_frame(msg_type, buf)
    }

    fn stitch_frames(
        requests: &mut VecDeque<Frame>,
        responses: &mut VecDeque<Frame>,
        state: &mut State,
    ) -> RecordsWithErrorCount<Record> {
        stitcher::stitch_frames(requests, responses, state)
    }
}
