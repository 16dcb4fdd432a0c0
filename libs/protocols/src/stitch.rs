//! Default FIFO stitching
//!
//! For protocols without a correlation id the k-th unmatched response answers
//! the k-th unmatched request. A response captured before the oldest pending
//! request cannot belong to it (typically stale bytes from before the tracker
//! started), so it is dropped and counted instead of consuming the request.

use crate::interface::{FrameBase, RecordsWithErrorCount};
use std::collections::VecDeque;
use tracing::debug;

/// Pair requests and responses in queue order
///
/// Responses are consumed in arrival order. Requests left without a response
/// stay at the front of `requests` for the next call.
pub fn stitch_fifo<F, R>(
    requests: &mut VecDeque<F>,
    responses: &mut VecDeque<F>,
    mut pair: impl FnMut(F, F) -> R,
) -> RecordsWithErrorCount<R>
where
    F: FrameBase,
{
    let mut result = RecordsWithErrorCount {
        records: Vec::with_capacity(responses.len().min(requests.len())),
        error_count: 0,
    };

    while let Some(resp) = responses.pop_front() {
        match requests.front() {
            Some(req) if req.timestamp_ns() <= resp.timestamp_ns() => {
                if let Some(req) = requests.pop_front() {
                    result.records.push(pair(req, resp));
                }
            }
            _ => {
                debug!(
                    timestamp_ns = resp.timestamp_ns(),
                    "Dropping response without a pending request"
                );
                result.error_count += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestFrame {
        ts: u64,
        tag: u32,
    }

    impl FrameBase for TestFrame {
        fn timestamp_ns(&self) -> u64 {
            self.ts
        }
        fn set_timestamp_ns(&mut self, timestamp_ns: u64) {
            self.ts = timestamp_ns;
        }
        fn byte_size(&self) -> usize {
            4
        }
    }

    fn frames(specs: &[(u64, u32)]) -> VecDeque<TestFrame> {
        specs.iter().map(|&(ts, tag)| TestFrame { ts, tag }).collect()
    }

    #[test]
    fn test_pairs_in_order() {
        let mut reqs = frames(&[(1, 10), (2, 20), (3, 30)]);
        let mut resps = frames(&[(4, 11), (5, 21), (6, 31)]);

        let result = stitch_fifo(&mut reqs, &mut resps, |req, resp| (req.tag, resp.tag));
        assert_eq!(result.records, vec![(10, 11), (20, 21), (30, 31)]);
        assert_eq!(result.error_count, 0);
        assert!(reqs.is_empty());
        assert!(resps.is_empty());
    }

    #[test]
    fn test_dangling_response() {
        let mut reqs = VecDeque::new();
        let mut resps = frames(&[(1, 11)]);

        let result = stitch_fifo(&mut reqs, &mut resps, |req: TestFrame, resp| (req.tag, resp.tag));
        assert!(result.records.is_empty());
        assert_eq!(result.error_count, 1);
        assert!(resps.is_empty());
    }

    #[test]
    fn test_pending_request_kept() {
        let mut reqs = frames(&[(1, 10), (2, 20)]);
        let mut resps = frames(&[(3, 11)]);

        let result = stitch_fifo(&mut reqs, &mut resps, |req, resp| (req.tag, resp.tag));
        assert_eq!(result.records, vec![(10, 11)]);
        assert_eq!(reqs, frames(&[(2, 20)]));
    }

    #[test]
    fn test_stale_response_before_request() {
        let mut reqs = frames(&[(5, 10)]);
        let mut resps = frames(&[(1, 99), (6, 11)]);

        let result = stitch_fifo(&mut reqs, &mut resps, |req, resp| (req.tag, resp.tag));
        assert_eq!(result.records, vec![(10, 11)]);
        assert_eq!(result.error_count, 1);
    }
}
