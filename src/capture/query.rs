use std::collections::HashMap;
use std::sync::Arc;

use crate::capture::store::AggregationStore;
use crate::models::packet::PacketRecord;
use crate::models::stats::{HistorySummary, IpPairCount, PortUsage, Snapshot};

/// Read-only views over the aggregation store for polling consumers.
///
/// Every call takes one store snapshot; nothing here locks or mutates on its own.
/// Consumers that show several views together should take one `snapshot` and
/// derive each view from it with `port_rows` and `ranked_pairs`.
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<AggregationStore>,
}

impl QueryFacade {
    pub fn new(store: Arc<AggregationStore>) -> Self {
        Self { store }
    }

    /// Aggregates plus the last `history_limit` records, all from the same instant
    pub fn snapshot(&self, history_limit: usize) -> Snapshot {
        self.store.snapshot_tail(history_limit)
    }

    /// The last `limit` records in arrival order
    pub fn recent_history(&self, limit: usize) -> Vec<PacketRecord> {
        if limit == 0 {
            return Vec::new();
        }
        self.store.snapshot_tail(limit).history
    }

    pub fn max_length_by_protocol(&self) -> HashMap<String, u32> {
        self.store.snapshot_tail(0).max_length_by_protocol
    }

    /// Port usage rows, by count (descending) or by port number (ascending).
    /// Equal counts are ordered by ascending port.
    pub fn port_usage_count(&self, sorted_descending: bool) -> Vec<PortUsage> {
        port_rows(self.store.snapshot_tail(0).port_usage_count, sorted_descending)
    }

    /// Source -> destination pairs over retained history, most frequent first.
    /// Records missing either address are not counted.
    pub fn ip_pair_counts(&self) -> Vec<IpPairCount> {
        ranked_pairs(self.store.snapshot_tail(0).ip_pair_counts)
    }

    pub fn summary(&self) -> HistorySummary {
        let snapshot = self.store.snapshot_tail(0);
        HistorySummary {
            total_appended: snapshot.total_appended,
            retained: match self.store.capacity() {
                Some(capacity) => (snapshot.total_appended as usize).min(capacity),
                None => snapshot.total_appended as usize,
            },
            protocols: snapshot.max_length_by_protocol.len(),
            ports: snapshot.port_usage_count.len(),
        }
    }
}

/// Order port counts for display
pub fn port_rows(counts: HashMap<u16, u64>, sorted_descending: bool) -> Vec<PortUsage> {
    let mut rows: Vec<PortUsage> = counts
        .into_iter()
        .map(|(port, usage_count)| PortUsage { port, usage_count })
        .collect();

    if sorted_descending {
        rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then(a.port.cmp(&b.port)));
    } else {
        rows.sort_by_key(|row| row.port);
    }
    rows
}

/// Most frequent pairs first, then by source and destination text
pub fn ranked_pairs(mut pairs: Vec<IpPairCount>) -> Vec<IpPairCount> {
    pairs.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.destination.cmp(&b.destination))
    });
    pairs
}
