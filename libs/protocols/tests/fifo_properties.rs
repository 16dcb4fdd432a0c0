//! Property tests for the default FIFO stitching policy

use proptest::prelude::*;
use std::collections::VecDeque;
use wiretap_protocols::{stitch_fifo, FrameBase};

#[derive(Debug, Clone, PartialEq)]
struct Tagged {
    ts: u64,
    tag: usize,
}

impl FrameBase for Tagged {
    fn timestamp_ns(&self) -> u64 {
        self.ts
    }

    fn set_timestamp_ns(&mut self, timestamp_ns: u64) {
        self.ts = timestamp_ns;
    }

    fn byte_size(&self) -> usize {
        1
    }
}

/// `n` requests each answered before the next is sent
fn alternating(n: usize) -> (VecDeque<Tagged>, VecDeque<Tagged>) {
    let requests = (0..n).map(|i| Tagged { ts: 2 * i as u64, tag: i }).collect();
    let responses = (0..n).map(|i| Tagged { ts: 2 * i as u64 + 1, tag: i }).collect();
    (requests, responses)
}

proptest! {
    #[test]
    fn fifo_pairs_kth_with_kth(n in 0usize..64, extra in 0usize..8) {
        let (mut requests, mut responses) = alternating(n + extra);
        responses.truncate(n);

        let result = stitch_fifo(&mut requests, &mut responses, |req, resp| (req.tag, resp.tag));
        prop_assert_eq!(result.error_count, 0);
        prop_assert_eq!(result.records.len(), n);
        prop_assert!(result.records.iter().all(|(req, resp)| req == resp));
        prop_assert_eq!(requests.len(), extra);
        prop_assert!(responses.is_empty());
    }

    #[test]
    fn fifo_accounts_for_every_response(
        req_ts in prop::collection::vec(0u64..1000, 0..32),
        resp_ts in prop::collection::vec(0u64..1000, 0..32),
    ) {
        let mut req_ts = req_ts;
        req_ts.sort_unstable();
        let total_requests = req_ts.len();
        let total_responses = resp_ts.len();
        let mut requests: VecDeque<Tagged> =
            req_ts.into_iter().enumerate().map(|(tag, ts)| Tagged { ts, tag }).collect();
        let mut responses: VecDeque<Tagged> =
            resp_ts.into_iter().enumerate().map(|(tag, ts)| Tagged { ts, tag }).collect();

        let result = stitch_fifo(&mut requests, &mut responses, |req, resp| (req, resp));
        prop_assert_eq!(result.records.len() + result.error_count, total_responses);
        prop_assert_eq!(result.records.len() + requests.len(), total_requests);
        for (req, resp) in &result.records {
            prop_assert!(req.ts <= resp.ts);
        }
        // Matched requests are a prefix of the original queue.
        for (i, (req, _)) in result.records.iter().enumerate() {
            prop_assert_eq!(req.tag, i);
        }
    }
}
