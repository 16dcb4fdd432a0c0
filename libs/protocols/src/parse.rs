//! Frame parse loop with resynchronization
//!
//! Drains every complete frame from a [`DataStream`] into an ordered queue.
//! An invalid frame is counted, then the stream skips ahead to the next
//! plausible frame header found by the protocol's boundary finder. If no
//! boundary exists in the buffered bytes, the whole buffer is dropped.

use crate::data_stream::DataStream;
use crate::interface::{FrameBase, MessageType, ParseOutcome, ParseState, Protocol};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// What one pass over a stream did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSummary {
    pub frames_parsed: usize,
    /// Invalid frames plus oversized buffers dropped while waiting
    pub error_count: usize,
    pub bytes_dropped: usize,
    /// `Success` when the buffer was fully drained
    pub end_state: ParseState,
}

/// Parse all complete frames in `stream`, appending them to `frames`
///
/// A buffer still waiting for more data after the pass is dropped when it has
/// grown past `max_buffer_bytes`; no frame that large is considered plausible.
pub fn parse_frames<P: Protocol>(
    msg_type: MessageType,
    stream: &mut DataStream,
    frames: &mut VecDeque<P::Frame>,
    max_buffer_bytes: usize,
) -> ParseSummary {
    let mut summary = ParseSummary {
        frames_parsed: 0,
        error_count: 0,
        bytes_dropped: 0,
        end_state: ParseState::Success,
    };

    while !stream.is_empty() {
        let timestamp_ns = stream.front_timestamp_ns();
        let (outcome, consumed) = {
            let mut view = stream.bytes();
            let before = view.len();
            let outcome = P::parse_frame(msg_type, &mut view);
            (outcome, before - view.len())
        };

        match outcome {
            ParseOutcome::Success(mut frame) if consumed > 0 => {
                frame.set_timestamp_ns(timestamp_ns);
                stream.consume(consumed);
                trace!(protocol = P::NAME, ?msg_type, bytes = consumed, "Parsed frame");
                frames.push_back(frame);
                summary.frames_parsed += 1;
            }
            ParseOutcome::NeedsMoreData => {
                summary.end_state = ParseState::NeedsMoreData;
                break;
            }
            ParseOutcome::Success(_) | ParseOutcome::Invalid => {
                summary.error_count += 1;
                let skipped = match P::find_frame_boundary(msg_type, stream.bytes(), 0) {
                    Some(pos) => {
                        stream.consume(pos);
                        pos
                    }
                    None => stream.clear(),
                };
                summary.bytes_dropped += skipped;
                debug!(
                    protocol = P::NAME,
                    ?msg_type,
                    skipped,
                    "Invalid frame, resynchronized stream"
                );
            }
        }
    }

    if summary.end_state == ParseState::NeedsMoreData && stream.len() > max_buffer_bytes {
        warn!(
            protocol = P::NAME,
            ?msg_type,
            buffered = stream.len(),
            max_buffer_bytes,
            "Dropping oversized partial frame"
        );
        summary.bytes_dropped += stream.clear();
        summary.error_count += 1;
        summary.end_state = ParseState::Invalid;
    }

    summary
}

/// Total wire bytes held by a frame queue
pub fn queued_bytes<F: FrameBase>(frames: &VecDeque<F>) -> usize {
    frames.iter().map(FrameBase::byte_size).sum()
}
