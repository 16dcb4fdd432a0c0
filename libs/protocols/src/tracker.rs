//! # Connection Tracker
//!
//! ## Purpose
//!
//! Owns everything known about one traced connection: the unparsed bytes of
//! each direction, the frames parsed but not yet stitched, and the protocol's
//! per-connection state. Captured chunks go in through [`ConnTracker::add_data`];
//! records come out of [`ConnTracker::process`].
//!
//! ## Direction Mapping
//!
//! Capture directions are relative to the traced process. The [`Role`] decides
//! which of them carries requests:
//!
//! | Role   | Egress    | Ingress   |
//! |--------|-----------|-----------|
//! | Client | requests  | responses |
//! | Server | responses | requests  |
//!
//! ## Expiry
//!
//! A request whose response never arrives would otherwise sit in its queue
//! forever. Frames older than the configured expiry (measured against the
//! `now_ns` passed to `process`) are evicted and counted as errors.

use crate::config::TrackerConfig;
use crate::data_stream::DataStream;
use crate::interface::{FrameBase, MessageType, Protocol, RecordsWithErrorCount};
use crate::parse::{parse_frames, ParseSummary};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// Which end of the connection the traced process is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
}

/// Capture direction relative to the traced process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficDirection {
    Egress,
    Ingress,
}

impl Role {
    /// Message type carried by `direction` for this role
    pub fn message_type(self, direction: TrafficDirection) -> MessageType {
        match (self, direction) {
            (Role::Client, TrafficDirection::Egress) | (Role::Server, TrafficDirection::Ingress) => {
                MessageType::Request
            }
            (Role::Client, TrafficDirection::Ingress) | (Role::Server, TrafficDirection::Egress) => {
                MessageType::Response
            }
        }
    }
}

/// Per-connection counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub bytes_received: u64,
    pub frames_parsed: u64,
    pub records: u64,
    pub parse_errors: u64,
    pub stitch_errors: u64,
    pub frames_expired: u64,
    pub bytes_dropped: u64,
}

impl TrackerStats {
    /// Fold another tracker's counters into these
    pub fn accumulate(&mut self, other: &TrackerStats) {
        self.bytes_received += other.bytes_received;
        self.frames_parsed += other.frames_parsed;
        self.records += other.records;
        self.parse_errors += other.parse_errors;
        self.stitch_errors += other.stitch_errors;
        self.frames_expired += other.frames_expired;
        self.bytes_dropped += other.bytes_dropped;
    }

    fn record_parse(&mut self, summary: &ParseSummary) {
        self.frames_parsed += summary.frames_parsed as u64;
        self.parse_errors += summary.error_count as u64;
        self.bytes_dropped += summary.bytes_dropped as u64;
    }
}

pub struct ConnTracker<P: Protocol> {
    conn_id: u64,
    role: Role,
    max_buffer_bytes: usize,
    frame_expiry_ns: u64,
    idle_timeout_ns: u64,
    req_data: DataStream,
    resp_data: DataStream,
    requests: VecDeque<P::Frame>,
    responses: VecDeque<P::Frame>,
    /// Created on the first stitch
    state: Option<P::State>,
    stats: TrackerStats,
    last_activity_ns: u64,
}

fn secs_to_ns(secs: u64) -> u64 {
    secs.saturating_mul(1_000_000_000)
}

impl<P: Protocol> ConnTracker<P> {
    pub fn new(conn_id: u64, role: Role, config: &TrackerConfig) -> Self {
        debug!(protocol = P::NAME, conn_id, ?role, "Tracking connection");
        Self {
            conn_id,
            role,
            max_buffer_bytes: config.max_buffer_bytes,
            frame_expiry_ns: secs_to_ns(config.frame_expiry_secs),
            idle_timeout_ns: secs_to_ns(config.idle_timeout_secs),
            req_data: DataStream::new(),
            resp_data: DataStream::new(),
            requests: VecDeque::new(),
            responses: VecDeque::new(),
            state: None,
            stats: TrackerStats::default(),
            last_activity_ns: 0,
        }
    }

    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    pub fn state(&self) -> Option<&P::State> {
        self.state.as_ref()
    }

    /// Frames parsed but not yet stitched, (requests, responses)
    pub fn queued_frames(&self) -> (usize, usize) {
        (self.requests.len(), self.responses.len())
    }

    /// Append captured bytes for one direction
    pub fn add_data(&mut self, direction: TrafficDirection, data: &[u8], timestamp_ns: u64) {
        let stream = match self.role.message_type(direction) {
            MessageType::Request => &mut self.req_data,
            MessageType::Response => &mut self.resp_data,
        };
        stream.add_data(data, timestamp_ns);
        self.stats.bytes_received += data.len() as u64;
        self.last_activity_ns = self.last_activity_ns.max(timestamp_ns);
        trace!(conn_id = self.conn_id, ?direction, bytes = data.len(), "Captured chunk");
    }

    /// Parse both directions, stitch, then evict expired frames
    pub fn process(&mut self, now_ns: u64) -> RecordsWithErrorCount<P::Record> {
        let req_summary = parse_frames::<P>(
            MessageType::Request,
            &mut self.req_data,
            &mut self.requests,
            self.max_buffer_bytes,
        );
        let resp_summary = parse_frames::<P>(
            MessageType::Response,
            &mut self.resp_data,
            &mut self.responses,
            self.max_buffer_bytes,
        );
        self.stats.record_parse(&req_summary);
        self.stats.record_parse(&resp_summary);

        let mut result = RecordsWithErrorCount::default();
        result.error_count += req_summary.error_count + resp_summary.error_count;

        if !self.responses.is_empty() {
            let state = self.state.get_or_insert_with(P::State::default);
            let stitched = P::stitch_frames(&mut self.requests, &mut self.responses, state);
            self.stats.records += stitched.records.len() as u64;
            self.stats.stitch_errors += stitched.error_count as u64;
            result.merge(stitched);
        }

        let expired = self.evict_expired(now_ns);
        result.error_count += expired;

        result
    }

    fn evict_expired(&mut self, now_ns: u64) -> usize {
        let cutoff = now_ns.saturating_sub(self.frame_expiry_ns);
        let before = self.requests.len() + self.responses.len();
        self.requests.retain(|f| f.timestamp_ns() >= cutoff);
        self.responses.retain(|f| f.timestamp_ns() >= cutoff);
        let expired = before - (self.requests.len() + self.responses.len());
        if expired > 0 {
            debug!(
                protocol = P::NAME,
                conn_id = self.conn_id,
                expired,
                "Evicted frames past expiry"
            );
            self.stats.frames_expired += expired as u64;
        }
        expired
    }

    /// No traffic for longer than the idle timeout
    pub fn is_idle(&self, now_ns: u64) -> bool {
        now_ns.saturating_sub(self.last_activity_ns) > self.idle_timeout_ns
    }

    /// Discard queued frames and buffered bytes, returning the frames discarded
    pub fn close(&mut self) -> usize {
        let discarded = self.requests.len() + self.responses.len();
        self.requests.clear();
        self.responses.clear();
        let bytes = self.req_data.clear() + self.resp_data.clear();
        self.stats.bytes_dropped += bytes as u64;
        info!(
            protocol = P::NAME,
            conn_id = self.conn_id,
            records = self.stats.records,
            discarded_frames = discarded,
            discarded_bytes = bytes,
            "Connection closed"
        );
        discarded
    }
}
