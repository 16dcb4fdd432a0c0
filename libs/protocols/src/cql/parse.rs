//! CQL frame parsing and boundary search
//!
//! A header is accepted only if every field is plausible for the direction
//! being parsed: known protocol version with the right direction bit, no
//! unknown flag bits, an opcode that direction may send, a non-negative stream
//! on requests, and a body length under [`MAX_BODY_BYTES`]. The boundary finder
//! applies the same checks at every offset.

use super::frame::{
    flags, Frame, FrameHeader, Opcode, HEADER_LENGTH, MAX_BODY_BYTES, MAX_VERSION, MIN_VERSION,
    RESPONSE_BIT,
};
use crate::interface::{MessageType, ParseOutcome};
use wiretap_codec::{DecodeResult, TypeDecoder};

struct RawHeader {
    version: u8,
    flags: u8,
    stream: i16,
    opcode: u8,
    length: u32,
}

fn decode_raw_header(buf: &[u8]) -> DecodeResult<RawHeader> {
    let mut decoder = TypeDecoder::new(buf);
    Ok(RawHeader {
        version: decoder.extract_byte()?,
        flags: decoder.extract_byte()?,
        stream: decoder.extract_short()? as i16,
        opcode: decoder.extract_byte()?,
        length: decoder.extract_int()? as u32,
    })
}

/// Decode and validate the header at the front of `buf`
fn parse_header(msg_type: MessageType, buf: &[u8]) -> ParseOutcome<FrameHeader> {
    let Ok(raw) = decode_raw_header(buf) else {
        return ParseOutcome::NeedsMoreData;
    };

    let expected_bit = match msg_type {
        MessageType::Request => 0,
        MessageType::Response => RESPONSE_BIT,
    };
    if raw.version & RESPONSE_BIT != expected_bit {
        return ParseOutcome::Invalid;
    }
    let version = raw.version & !RESPONSE_BIT;
    if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
        return ParseOutcome::Invalid;
    }
    if raw.flags & !flags::ALL != 0 {
        return ParseOutcome::Invalid;
    }
    let Ok(opcode) = Opcode::try_from(raw.opcode) else {
        return ParseOutcome::Invalid;
    };
    if !opcode.is_valid_for(msg_type) {
        return ParseOutcome::Invalid;
    }
    if msg_type == MessageType::Request && raw.stream < 0 {
        return ParseOutcome::Invalid;
    }
    if raw.length as usize > MAX_BODY_BYTES {
        return ParseOutcome::Invalid;
    }

    ParseOutcome::Success(FrameHeader {
        version: raw.version,
        flags: raw.flags,
        stream: raw.stream,
        opcode,
        length: raw.length,
    })
}

pub fn parse_frame(msg_type: MessageType, buf: &mut &[u8]) -> ParseOutcome<Frame> {
    let hdr = match parse_header(msg_type, buf) {
        ParseOutcome::Success(hdr) => hdr,
        ParseOutcome::NeedsMoreData => return ParseOutcome::NeedsMoreData,
        ParseOutcome::Invalid => return ParseOutcome::Invalid,
    };

    let frame_len = HEADER_LENGTH + hdr.length as usize;
    if buf.len() < frame_len {
        return ParseOutcome::NeedsMoreData;
    }

    let msg = buf[HEADER_LENGTH..frame_len].to_vec();
    *buf = &buf[frame_len..];
    ParseOutcome::Success(Frame {
        hdr,
        msg,
        timestamp_ns: 0,
    })
}

pub fn find_frame_boundary(msg_type: MessageType, buf: &[u8], start_pos: usize) -> Option<usize> {
    let first = start_pos.checked_add(1)?;
    let last = buf.len().checked_sub(HEADER_LENGTH)?;
    (first..=last).find(|&pos| matches!(parse_header(msg_type, &buf[pos..]), ParseOutcome::Success(_)))
}
