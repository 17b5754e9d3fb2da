use log::{log_enabled, trace, Level};

use crate::models::packet::{DecodedPacket, PacketRecord};

/// Reduces decoded packets to the feature records used for aggregation.
///
/// Missing layers are expected and leave fields empty. A record is only
/// produced when the packet has a timestamp and a transport layer; a packet
/// with an inconsistent capture header is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, packet: &DecodedPacket) -> Option<PacketRecord> {
        let captured_at = packet.captured_at?;
        let transport = packet.transport.as_ref()?;

        if transport.protocol.is_empty() {
            return None;
        }

        if let Some(wire_length) = packet.wire_length {
            if packet.captured_length > wire_length {
                if log_enabled!(Level::Trace) {
                    trace!(
                        "Dropping packet: captured {} bytes of a {} byte frame",
                        packet.captured_length,
                        wire_length
                    );
                }
                return None;
            }
        }

        Some(PacketRecord {
            source_address: packet.network.as_ref().map(|n| n.source.to_string()),
            destination_address: packet.network.as_ref().map(|n| n.destination.to_string()),
            transport_protocol: Some(transport.protocol.clone()),
            frame_length: packet.wire_length,
            captured_at,
            source_port: transport.source_port,
            destination_port: transport.destination_port,
        })
    }
}
