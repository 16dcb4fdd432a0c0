//! Connection registry
//!
//! Maps connection ids to their trackers. Trackers are created on first data,
//! processed together by [`TrackerRegistry::poll`], and closed either
//! explicitly or once idle.

use crate::config::TrackerConfig;
use crate::interface::{Protocol, RecordsWithErrorCount};
use crate::tracker::{ConnTracker, Role, TrackerStats, TrafficDirection};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A record tagged with the connection it was traced on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnRecord<R> {
    pub conn_id: u64,
    #[serde(flatten)]
    pub record: R,
}

/// Registry-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub active_connections: usize,
    pub closed_connections: u64,
    /// Counters of live and closed trackers combined
    pub totals: TrackerStats,
}

pub struct TrackerRegistry<P: Protocol> {
    config: TrackerConfig,
    default_role: Role,
    trackers: HashMap<u64, ConnTracker<P>>,
    closed_stats: TrackerStats,
    closed_connections: u64,
}

impl<P: Protocol> TrackerRegistry<P> {
    /// Connections first seen through `add_data` get `default_role`
    pub fn new(config: TrackerConfig, default_role: Role) -> Self {
        info!(
            protocol = P::NAME,
            ?default_role,
            max_buffer_bytes = config.max_buffer_bytes,
            "Creating tracker registry"
        );
        Self {
            config,
            default_role,
            trackers: HashMap::new(),
            closed_stats: TrackerStats::default(),
            closed_connections: 0,
        }
    }

    /// Start tracking `conn_id` with an explicit role
    ///
    /// Returns false if the connection is already tracked; its role is kept.
    pub fn open(&mut self, conn_id: u64, role: Role) -> bool {
        if self.trackers.contains_key(&conn_id) {
            warn!(conn_id, "Connection already tracked");
            return false;
        }
        self.trackers
            .insert(conn_id, ConnTracker::new(conn_id, role, &self.config));
        true
    }

    pub fn add_data(
        &mut self,
        conn_id: u64,
        direction: TrafficDirection,
        data: &[u8],
        timestamp_ns: u64,
    ) {
        let config = &self.config;
        let role = self.default_role;
        self.trackers
            .entry(conn_id)
            .or_insert_with(|| ConnTracker::new(conn_id, role, config))
            .add_data(direction, data, timestamp_ns);
    }

    /// Process every connection, then close the idle ones
    ///
    /// Frames discarded by closing are included in the error count.
    pub fn poll(&mut self, now_ns: u64) -> RecordsWithErrorCount<ConnRecord<P::Record>> {
        let mut result = RecordsWithErrorCount::default();

        for (&conn_id, tracker) in self.trackers.iter_mut() {
            let processed = tracker.process(now_ns);
            result.error_count += processed.error_count;
            result.records.extend(
                processed
                    .records
                    .into_iter()
                    .map(|record| ConnRecord { conn_id, record }),
            );
        }

        let idle: Vec<u64> = self
            .trackers
            .iter()
            .filter(|(_, tracker)| tracker.is_idle(now_ns))
            .map(|(&conn_id, _)| conn_id)
            .collect();
        for conn_id in idle {
            debug!(conn_id, "Closing idle connection");
            if let Some(discarded) = self.close(conn_id) {
                result.error_count += discarded;
            }
        }

        result
    }

    /// Stop tracking `conn_id`, returning the number of frames discarded
    pub fn close(&mut self, conn_id: u64) -> Option<usize> {
        let mut tracker = self.trackers.remove(&conn_id)?;
        let discarded = tracker.close();
        self.closed_stats.accumulate(tracker.stats());
        self.closed_connections += 1;
        Some(discarded)
    }

    /// Close every connection, returning the total frames discarded
    pub fn close_all(&mut self) -> usize {
        let conn_ids: Vec<u64> = self.trackers.keys().copied().collect();
        conn_ids
            .into_iter()
            .filter_map(|conn_id| self.close(conn_id))
            .sum()
    }

    pub fn get(&self, conn_id: u64) -> Option<&ConnTracker<P>> {
        self.trackers.get(&conn_id)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut totals = self.closed_stats;
        for tracker in self.trackers.values() {
            totals.accumulate(tracker.stats());
        }
        RegistryStats {
            active_connections: self.trackers.len(),
            closed_connections: self.closed_connections,
            totals,
        }
    }
}
