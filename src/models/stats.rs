use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::packet::PacketRecord;

/// Point-in-time copy of the aggregation state.
///
/// `history` and the aggregates always reflect the same prefix of appends;
/// `total_appended` is the length of that prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Retained records in arrival order (possibly only a tail)
    pub history: Vec<PacketRecord>,

    /// Largest frame length seen per transport protocol
    pub max_length_by_protocol: HashMap<String, u32>,

    /// Number of times each port appeared as source or destination
    pub port_usage_count: HashMap<u16, u64>,

    /// Source -> destination counts over retained history, unordered
    pub ip_pair_counts: Vec<IpPairCount>,

    /// Records ever appended in this session
    pub total_appended: u64,
}

/// One row of the port usage table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortUsage {
    pub port: u16,
    pub usage_count: u64,
}

/// One row of the source -> destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPairCount {
    pub source: String,
    pub destination: String,
    pub count: u64,
}

impl IpPairCount {
    /// "src -> dst" label used by the dashboard
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source, self.destination)
    }
}

/// Counters kept by the ingestion loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Packets read from the source
    pub received: u64,

    /// Packets that produced a record and were appended
    pub appended: u64,

    /// Packets that produced no record
    pub dropped: u64,
}

/// Overview of the aggregation state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_appended: u64,
    pub retained: usize,
    pub protocols: usize,
    pub ports: usize,
}
