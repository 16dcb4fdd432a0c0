//! CQL records and per-connection state

use super::frame::Opcode;
use crate::interface::ConnState;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Prepared statements remembered per connection
pub const MAX_PREPARED_STATEMENTS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub op: Opcode,
    /// Human-readable rendering of the request body
    pub msg: String,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub op: Opcode,
    /// Human-readable rendering of the response body
    pub msg: String,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub req: Request,
    pub resp: Response,
}

impl Record {
    pub fn latency_ns(&self) -> u64 {
        self.resp.timestamp_ns.saturating_sub(self.req.timestamp_ns)
    }
}

/// Prepared statement id to query text, learned from PREPARE/RESULT pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedCache {
    queries: HashMap<Vec<u8>, String>,
    order: VecDeque<Vec<u8>>,
}

impl PreparedCache {
    pub fn insert(&mut self, id: Vec<u8>, query: String) {
        if self.queries.insert(id.clone(), query).is_some() {
            return;
        }
        self.order.push_back(id);
        if self.order.len() > MAX_PREPARED_STATEMENTS {
            if let Some(oldest) = self.order.pop_front() {
                self.queries.remove(&oldest);
            }
        }
    }

    pub fn get(&self, id: &[u8]) -> Option<&str> {
        self.queries.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Prepared statements span both directions, so they live in `global`
pub type State = ConnState<PreparedCache, (), ()>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepared_cache_evicts_oldest() {
        let mut cache = PreparedCache::default();
        for i in 0..=MAX_PREPARED_STATEMENTS {
            cache.insert((i as u32).to_be_bytes().to_vec(), format!("q{i}"));
        }
        assert_eq!(cache.len(), MAX_PREPARED_STATEMENTS);
        assert_eq!(cache.get(&0u32.to_be_bytes()), None);
        assert_eq!(cache.get(&1u32.to_be_bytes()), Some("q1"));
    }

    #[test]
    fn test_prepared_cache_reinsert_updates() {
        let mut cache = PreparedCache::default();
        cache.insert(vec![1], "old".into());
        cache.insert(vec![1], "new".into());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&[1]), Some("new"));
    }
}
