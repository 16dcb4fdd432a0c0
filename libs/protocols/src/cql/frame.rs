//! CQL frame layout
//!
//! ```text
//! 0        1        2                 4        5                 9
//! +--------+--------+--------+--------+--------+--------+--------+---------
//! |version | flags  |     stream      | opcode |     length      | body...
//! +--------+--------+--------+--------+--------+--------+--------+---------
//! ```
//! The high bit of `version` marks a response; the low seven bits carry the
//! protocol version. All integers are big-endian.

use crate::interface::{FrameBase, MessageType};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

pub const HEADER_LENGTH: usize = 9;

/// Largest body accepted; the protocol caps frames at 256 MiB
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

pub const RESPONSE_BIT: u8 = 0x80;
pub const MIN_VERSION: u8 = 3;
pub const MAX_VERSION: u8 = 4;

/// Header flag bits
pub mod flags {
    pub const COMPRESSION: u8 = 0x01;
    pub const TRACING: u8 = 0x02;
    pub const CUSTOM_PAYLOAD: u8 = 0x04;
    pub const WARNING: u8 = 0x08;
    pub const USE_BETA: u8 = 0x10;
    pub const ALL: u8 = COMPRESSION | TRACING | CUSTOM_PAYLOAD | WARNING | USE_BETA;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u8)]
pub enum Opcode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Event = 0x0C,
    Batch = 0x0D,
    AuthChallenge = 0x0E,
    AuthResponse = 0x0F,
    AuthSuccess = 0x10,
}

impl Opcode {
    /// Whether a client may send this opcode (request) or a server (response)
    pub fn is_valid_for(self, msg_type: MessageType) -> bool {
        use Opcode::*;
        match msg_type {
            MessageType::Request => matches!(
                self,
                Startup | Options | Query | Prepare | Execute | Register | Batch | AuthResponse
            ),
            MessageType::Response => matches!(
                self,
                Error | Ready | Authenticate | Supported | Result | Event | AuthChallenge
                    | AuthSuccess
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub flags: u8,
    pub stream: i16,
    pub opcode: Opcode,
    pub length: u32,
}

impl FrameHeader {
    pub fn msg_type(&self) -> MessageType {
        if self.version & RESPONSE_BIT != 0 {
            MessageType::Response
        } else {
            MessageType::Request
        }
    }

    pub fn protocol_version(&self) -> u8 {
        self.version & !RESPONSE_BIT
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & flags::COMPRESSION != 0
    }
}

/// One captured CQL message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub hdr: FrameHeader,
    pub msg: Vec<u8>,
    pub timestamp_ns: u64,
}

impl FrameBase for Frame {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    fn set_timestamp_ns(&mut self, timestamp_ns: u64) {
        self.timestamp_ns = timestamp_ns;
    }

    fn byte_size(&self) -> usize {
        HEADER_LENGTH + self.msg.len()
    }
}
