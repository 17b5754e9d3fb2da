use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Network-layer view of a decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLayer {
    pub source: IpAddr,
    pub destination: IpAddr,
}

/// Transport-layer view of a decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportLayer {
    /// Protocol label (e.g., TCP, UDP)
    pub protocol: String,

    /// Absent when the header is too short to carry ports
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
}

/// A captured frame after link/network/transport decoding.
///
/// Every layer is optional: a frame without an IP header simply has no
/// `network`, one without TCP/UDP has no `transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Capture timestamp from the pcap header, if it was representable
    pub captured_at: Option<DateTime<Utc>>,

    /// Original length of the frame on the wire
    pub wire_length: Option<u32>,

    /// Number of bytes actually captured
    pub captured_length: u32,

    pub network: Option<NetworkLayer>,
    pub transport: Option<TransportLayer>,
}

/// The reduced feature record the aggregation store keeps per packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Source IP address
    pub source_address: Option<String>,

    /// Destination IP address
    pub destination_address: Option<String>,

    /// Transport protocol (e.g., TCP, UDP)
    pub transport_protocol: Option<String>,

    /// Length of the frame in bytes
    pub frame_length: Option<u32>,

    /// Timestamp when the packet was captured
    pub captured_at: DateTime<Utc>,

    /// Source port (for TCP/UDP)
    pub source_port: Option<u16>,

    /// Destination port (for TCP/UDP)
    pub destination_port: Option<u16>,
}
