//! CQL request/response stitching
//!
//! CQL multiplexes requests over stream ids, so responses can come back in any
//! order. Each response is matched with the oldest queued request on the same
//! stream that was captured no later than the response. The stream index is
//! built once per call, not rescanned per response.
//!
//! Server-pushed EVENT responses have no request; they are emitted with a
//! placeholder REGISTER request rather than counted as errors.

use super::body::{decode_request_body, decode_response_body};
use super::frame::{Frame, Opcode};
use super::types::{PreparedCache, Record, Request, Response, State};
use crate::interface::RecordsWithErrorCount;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// The request, and whether its body decoded
fn build_request(
    frame: &Frame,
    prepared: &PreparedCache,
    error_count: &mut usize,
) -> (Request, bool) {
    let (msg, decoded) = match decode_request_body(frame, prepared) {
        Ok(msg) => (msg, true),
        Err(e) => {
            debug!(opcode = ?frame.hdr.opcode, error = %e, "Failed to decode request body");
            *error_count += 1;
            (format!("<undecodable body: {e}>"), false)
        }
    };
    let req = Request {
        op: frame.hdr.opcode,
        msg,
        timestamp_ns: frame.timestamp_ns,
    };
    (req, decoded)
}

fn build_response(frame: &Frame, error_count: &mut usize) -> (Response, Option<Vec<u8>>) {
    let (msg, prepared_id) = match decode_response_body(frame) {
        Ok(decoded) => (decoded.msg, decoded.prepared_id),
        Err(e) => {
            debug!(opcode = ?frame.hdr.opcode, error = %e, "Failed to decode response body");
            *error_count += 1;
            (format!("<undecodable body: {e}>"), None)
        }
    };
    let resp = Response {
        op: frame.hdr.opcode,
        msg,
        timestamp_ns: frame.timestamp_ns,
    };
    (resp, prepared_id)
}

pub fn stitch_frames(
    requests: &mut VecDeque<Frame>,
    responses: &mut VecDeque<Frame>,
    state: &mut State,
) -> RecordsWithErrorCount<Record> {
    let mut result = RecordsWithErrorCount::default();

    // Queue positions of pending requests per stream, oldest first.
    let mut pending: HashMap<i16, VecDeque<usize>> = HashMap::new();
    for (i, req) in requests.iter().enumerate() {
        pending.entry(req.hdr.stream).or_default().push_back(i);
    }
    let mut slots: Vec<Option<Frame>> = requests.drain(..).map(Some).collect();

    for resp_frame in responses.drain(..) {
        if resp_frame.hdr.opcode == Opcode::Event {
            let (resp, _) = build_response(&resp_frame, &mut result.error_count);
            let req = Request {
                op: Opcode::Register,
                msg: "-".to_string(),
                timestamp_ns: resp.timestamp_ns,
            };
            result.records.push(Record { req, resp });
            continue;
        }

        let matched = pending.get_mut(&resp_frame.hdr.stream).and_then(|positions| {
            let &oldest = positions.front()?;
            let is_candidate = slots[oldest]
                .as_ref()
                .is_some_and(|req| req.timestamp_ns <= resp_frame.timestamp_ns);
            if is_candidate {
                positions.pop_front();
                slots[oldest].take()
            } else {
                None
            }
        });

        let Some(req_frame) = matched else {
            debug!(
                stream = resp_frame.hdr.stream,
                opcode = ?resp_frame.hdr.opcode,
                "Dropping response without a matching request"
            );
            result.error_count += 1;
            continue;
        };

        let (req, req_decoded) =
            build_request(&req_frame, &state.global, &mut result.error_count);
        let (resp, prepared_id) = build_response(&resp_frame, &mut result.error_count);
        if let (Opcode::Prepare, true, Some(id)) = (req.op, req_decoded, prepared_id) {
            state.global.insert(id, req.msg.clone());
        }
        result.records.push(Record { req, resp });
    }

    requests.extend(slots.into_iter().flatten());
    result
}
