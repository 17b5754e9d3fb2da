use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::models::packet::PacketRecord;
use crate::models::stats::{IpPairCount, Snapshot};

/// Owner of the capture history and the running aggregates.
///
/// A single mutex guards all of them so that a snapshot never shows history
/// and aggregates at different points. Critical sections are O(1) for
/// `append` and O(copied records + distinct keys) for snapshots.
pub struct AggregationStore {
    state: Mutex<AggregationState>,
}

struct AggregationState {
    history: VecDeque<PacketRecord>,
    capacity: Option<usize>,
    max_length_by_protocol: HashMap<String, u32>,
    port_usage_count: HashMap<u16, u64>,
    /// Tracks retained history only; decremented when a record is evicted
    ip_pair_count: HashMap<(String, String), u64>,
    total_appended: u64,
}

fn address_pair(record: &PacketRecord) -> Option<(&String, &String)> {
    match (&record.source_address, &record.destination_address) {
        (Some(src), Some(dst)) => Some((src, dst)),
        _ => None,
    }
}

impl AggregationStore {
    /// Store that retains every appended record
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Store that retains only the most recent `capacity` records in history.
    /// Aggregates still cover every record ever appended.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(Some(capacity.max(1)))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(AggregationState {
                history: VecDeque::with_capacity(capacity.unwrap_or(0).min(4096)),
                capacity,
                max_length_by_protocol: HashMap::new(),
                port_usage_count: HashMap::new(),
                ip_pair_count: HashMap::new(),
                total_appended: 0,
            }),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().capacity
    }

    pub fn append(&self, record: PacketRecord) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let (Some(protocol), Some(length)) = (&record.transport_protocol, record.frame_length) {
            match state.max_length_by_protocol.get_mut(protocol) {
                Some(max) => *max = (*max).max(length),
                None => {
                    state.max_length_by_protocol.insert(protocol.clone(), length);
                }
            }
        }

        // Source and destination are counted independently, so src == dst counts twice
        if let Some(port) = record.source_port {
            *state.port_usage_count.entry(port).or_insert(0) += 1;
        }
        if let Some(port) = record.destination_port {
            *state.port_usage_count.entry(port).or_insert(0) += 1;
        }

        if let Some(capacity) = state.capacity {
            if state.history.len() >= capacity {
                if let Some(evicted) = state.history.pop_front() {
                    state.forget_pair(&evicted);
                }
            }
        }
        if let Some((src, dst)) = address_pair(&record) {
            *state.ip_pair_count.entry((src.clone(), dst.clone())).or_insert(0) += 1;
        }
        state.history.push_back(record);
        state.total_appended += 1;

        if state.total_appended % 10_000 == 0 {
            debug!(
                "Aggregation store: {} records appended, {} retained",
                state.total_appended,
                state.history.len()
            );
        }
    }

    /// Consistent copy of the full retained history and both aggregates
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tail(usize::MAX)
    }

    /// Like `snapshot`, but copies only the last `limit` history records
    pub fn snapshot_tail(&self, limit: usize) -> Snapshot {
        let state = self.state.lock();
        let skip = state.history.len().saturating_sub(limit);
        Snapshot {
            history: state.history.iter().skip(skip).cloned().collect(),
            max_length_by_protocol: state.max_length_by_protocol.clone(),
            port_usage_count: state.port_usage_count.clone(),
            ip_pair_counts: state
                .ip_pair_count
                .iter()
                .map(|((source, destination), count)| IpPairCount {
                    source: source.clone(),
                    destination: destination.clone(),
                    count: *count,
                })
                .collect(),
            total_appended: state.total_appended,
        }
    }

    /// Records ever appended
    pub fn len(&self) -> u64 {
        self.state.lock().total_appended
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AggregationState {
    fn forget_pair(&mut self, record: &PacketRecord) {
        if let Some((src, dst)) = address_pair(record) {
            let key = (src.clone(), dst.clone());
            if let Some(count) = self.ip_pair_count.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.ip_pair_count.remove(&key);
                }
            }
        }
    }
}

impl Default for AggregationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use std::thread;

    pub(crate) fn record(protocol: &str, length: u32, src: Option<u16>, dst: Option<u16>) -> PacketRecord {
        PacketRecord {
            source_address: Some("10.0.0.1".to_string()),
            destination_address: Some("10.0.0.2".to_string()),
            transport_protocol: Some(protocol.to_string()),
            frame_length: Some(length),
            captured_at: Utc::now(),
            source_port: src,
            destination_port: dst,
        }
    }

    #[test]
    fn test_max_length_and_port_counts() {
        let store = AggregationStore::new();
        store.append(record("TCP", 40, Some(80), None));
        store.append(record("TCP", 60, Some(81), None));
        store.append(record("TCP", 55, Some(80), None));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.max_length_by_protocol.get("TCP"), Some(&60));
        assert_eq!(snapshot.port_usage_count.get(&80), Some(&2));
        assert_eq!(snapshot.port_usage_count.get(&81), Some(&1));
        assert_eq!(snapshot.history.len(), 3);
        assert_eq!(snapshot.total_appended, 3);
    }

    #[test]
    fn test_equal_ports_count_twice() {
        let store = AggregationStore::new();
        store.append(record("UDP", 90, Some(53), Some(53)));
        assert_eq!(store.snapshot().port_usage_count.get(&53), Some(&2));
    }

    #[test]
    fn test_unseen_protocol_is_absent() {
        let store = AggregationStore::new();
        store.append(record("UDP", 90, None, None));
        let snapshot = store.snapshot();
        assert!(snapshot.max_length_by_protocol.get("TCP").is_none());
        assert!(snapshot.port_usage_count.is_empty());
    }

    #[test]
    fn test_missing_length_does_not_touch_max() {
        let store = AggregationStore::new();
        let mut rec = record("TCP", 0, Some(22), None);
        rec.frame_length = None;
        store.append(rec);

        let snapshot = store.snapshot();
        assert!(snapshot.max_length_by_protocol.is_empty());
        assert_eq!(snapshot.port_usage_count.get(&22), Some(&1));
        assert_eq!(snapshot.history.len(), 1);
    }

    #[test]
    fn test_aggregates_ignore_append_order() {
        let records = vec![
            record("TCP", 100, Some(443), Some(50000)),
            record("UDP", 512, Some(53), Some(53)),
            record("TCP", 1500, Some(50000), Some(443)),
            record("UDP", 80, Some(123), None),
        ];

        let forward = AggregationStore::new();
        records.iter().cloned().for_each(|r| forward.append(r));
        let backward = AggregationStore::new();
        records.iter().rev().cloned().for_each(|r| backward.append(r));

        let a = forward.snapshot();
        let b = backward.snapshot();
        assert_eq!(a.max_length_by_protocol, b.max_length_by_protocol);
        assert_eq!(a.port_usage_count, b.port_usage_count);
    }

    #[test]
    fn test_bounded_history_keeps_aggregates() {
        let store = AggregationStore::with_capacity(2);
        store.append(record("TCP", 1500, Some(1), None));
        store.append(record("TCP", 40, Some(2), None));
        store.append(record("TCP", 40, Some(3), None));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[0].source_port, Some(2));
        assert_eq!(snapshot.history[1].source_port, Some(3));
        assert_eq!(snapshot.max_length_by_protocol.get("TCP"), Some(&1500));
        assert_eq!(snapshot.port_usage_count.get(&1), Some(&1));
        assert_eq!(snapshot.total_appended, 3);
    }

    fn pair_count(snapshot: &Snapshot, src: &str, dst: &str) -> Option<u64> {
        snapshot
            .ip_pair_counts
            .iter()
            .find(|p| p.source == src && p.destination == dst)
            .map(|p| p.count)
    }

    #[test]
    fn test_ip_pairs_follow_retained_history() {
        let store = AggregationStore::with_capacity(2);
        let mut reversed = record("UDP", 60, None, None);
        reversed.source_address = Some("10.0.0.2".to_string());
        reversed.destination_address = Some("10.0.0.1".to_string());

        store.append(record("TCP", 40, None, None));
        store.append(record("TCP", 40, None, None));
        assert_eq!(pair_count(&store.snapshot_tail(0), "10.0.0.1", "10.0.0.2"), Some(2));

        store.append(reversed.clone());
        let snapshot = store.snapshot_tail(0);
        assert_eq!(pair_count(&snapshot, "10.0.0.1", "10.0.0.2"), Some(1));
        assert_eq!(pair_count(&snapshot, "10.0.0.2", "10.0.0.1"), Some(1));

        store.append(reversed);
        let snapshot = store.snapshot_tail(0);
        assert_eq!(pair_count(&snapshot, "10.0.0.1", "10.0.0.2"), None);
        assert_eq!(pair_count(&snapshot, "10.0.0.2", "10.0.0.1"), Some(2));
        assert_eq!(snapshot.ip_pair_counts.len(), 1);
    }

    #[test]
    fn test_ip_pairs_skip_missing_addresses() {
        let store = AggregationStore::with_capacity(1);
        let mut anonymous = record("UDP", 60, None, None);
        anonymous.destination_address = None;

        store.append(record("TCP", 40, None, None));
        store.append(anonymous.clone());
        store.append(anonymous);
        assert!(store.snapshot().ip_pair_counts.is_empty());
    }

    #[test]
    fn test_snapshot_tail() {
        let store = AggregationStore::new();
        for port in 0..10u16 {
            store.append(record("UDP", 60, Some(port), None));
        }
        let tail = store.snapshot_tail(3);
        let ports: Vec<_> = tail.history.iter().map(|r| r.source_port.unwrap()).collect();
        assert_eq!(ports, vec![7, 8, 9]);
        assert_eq!(tail.total_appended, 10);
    }

    #[test]
    fn test_snapshots_are_atomic_under_concurrent_appends() {
        let store = Arc::new(AggregationStore::new());
        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..5_000u32 {
                    store.append(record("TCP", i, Some(1000), Some(2000)));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = store.snapshot();
                        let n = snapshot.history.len() as u64;
                        assert_eq!(snapshot.total_appended, n);
                        assert_eq!(snapshot.port_usage_count.get(&1000).copied().unwrap_or(0), n);
                        assert_eq!(snapshot.port_usage_count.get(&2000).copied().unwrap_or(0), n);
                        let pairs: u64 = snapshot.ip_pair_counts.iter().map(|p| p.count).sum();
                        assert_eq!(pairs, n);
                        if n > 0 {
                            // lengths are appended in increasing order
                            assert_eq!(snapshot.max_length_by_protocol.get("TCP"), Some(&(n as u32 - 1)));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.len(), 5_000);
    }
}
