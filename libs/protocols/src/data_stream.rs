//! Per-direction capture buffer
//!
//! Captured chunks are appended to one contiguous `BytesMut`, so a frame split
//! across chunks parses like any other. Each chunk remembers its capture
//! timestamp; a parsed frame takes the timestamp of the chunk holding its
//! first byte.

use bytes::{Buf, BytesMut};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct DataStream {
    buf: BytesMut,
    /// (absolute end offset, capture timestamp) of each chunk still in `buf`
    chunks: VecDeque<(u64, u64)>,
    /// Absolute stream offset of `buf[0]`
    offset: u64,
    last_timestamp_ns: u64,
}

impl DataStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a captured chunk
    pub fn add_data(&mut self, data: &[u8], timestamp_ns: u64) {
        if data.is_empty() {
            return;
        }
        self.buf.extend_from_slice(data);
        let end = self.offset + self.buf.len() as u64;
        self.chunks.push_back((end, timestamp_ns));
        self.last_timestamp_ns = self.last_timestamp_ns.max(timestamp_ns);
    }

    /// Unparsed bytes
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Capture timestamp of the first unparsed byte
    pub fn front_timestamp_ns(&self) -> u64 {
        self.chunks
            .front()
            .map(|&(_, ts)| ts)
            .unwrap_or(self.last_timestamp_ns)
    }

    /// Most recent capture timestamp seen on this stream
    pub fn last_timestamp_ns(&self) -> u64 {
        self.last_timestamp_ns
    }

    /// Drop `n` bytes from the front
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.advance(n);
        self.offset += n as u64;
        while matches!(self.chunks.front(), Some(&(end, _)) if end <= self.offset) {
            self.chunks.pop_front();
        }
    }

    /// Drop everything, returning the number of bytes discarded
    pub fn clear(&mut self) -> usize {
        let dropped = self.buf.len();
        self.consume(dropped);
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_follow_chunks() {
        let mut stream = DataStream::new();
        stream.add_data(b"abc", 100);
        stream.add_data(b"defg", 200);
        assert_eq!(stream.bytes(), b"abcdefg");
        assert_eq!(stream.front_timestamp_ns(), 100);

        stream.consume(2);
        assert_eq!(stream.front_timestamp_ns(), 100);
        stream.consume(1);
        assert_eq!(stream.front_timestamp_ns(), 200);
        assert_eq!(stream.bytes(), b"defg");
    }

    #[test]
    fn test_clear() {
        let mut stream = DataStream::new();
        stream.add_data(b"abc", 100);
        assert_eq!(stream.clear(), 3);
        assert!(stream.is_empty());
        assert_eq!(stream.front_timestamp_ns(), 100);

        stream.add_data(b"x", 300);
        assert_eq!(stream.front_timestamp_ns(), 300);
    }

    #[test]
    fn test_empty_chunk_ignored() {
        let mut stream = DataStream::new();
        stream.add_data(b"", 50);
        assert!(stream.is_empty());
        assert_eq!(stream.front_timestamp_ns(), 0);
    }
}
