//! JSON-lines capture input
//!
//! One captured chunk per line:
//!
//! ```text
//! {"conn": 1, "dir": "egress", "ts_ns": 1700000000000, "hex": "0400000105 00000000"}
//! ```
//!
//! Whitespace inside `hex` is ignored. Blank lines and lines starting with `#`
//! are skipped.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::BufRead;
use wiretap_protocols::TrafficDirection;

#[derive(Debug, Deserialize)]
struct CaptureLine {
    conn: u64,
    dir: TrafficDirection,
    ts_ns: u64,
    hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub conn_id: u64,
    pub direction: TrafficDirection,
    pub timestamp_ns: u64,
    pub data: Vec<u8>,
}

/// Parse one line; `Ok(None)` for lines carrying no event
pub fn parse_line(line: &str) -> Result<Option<CaptureEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let raw: CaptureLine = serde_json::from_str(line).context("Invalid capture record")?;
    let digits: String = raw.hex.chars().filter(|c| !c.is_whitespace()).collect();
    let data = hex::decode(&digits)
        .with_context(|| format!("Invalid hex payload on connection {}", raw.conn))?;
    Ok(Some(CaptureEvent {
        conn_id: raw.conn,
        direction: raw.dir,
        timestamp_ns: raw.ts_ns,
        data,
    }))
}

/// Iterate the events of a capture, tagging errors with their line number
pub fn read_events<R: BufRead>(reader: R) -> impl Iterator<Item = Result<CaptureEvent>> {
    reader.lines().enumerate().filter_map(|(idx, line)| {
        let line_no = idx + 1;
        let parsed = line
            .with_context(|| format!("Failed to read capture line {line_no}"))
            .and_then(|line| parse_line(&line))
            .with_context(|| format!("Capture line {line_no}"));
        parsed.transpose()
    })
}
