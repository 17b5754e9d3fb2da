use chrono::{DateTime, Utc};
use log::{log_enabled, trace, Level};
use pnet::packet::{
    ethernet::{EtherType, EtherTypes, EthernetPacket},
    ip::{IpNextHeaderProtocol, IpNextHeaderProtocols},
    ipv4::Ipv4Packet,
    ipv6::Ipv6Packet,
    tcp::TcpPacket,
    udp::UdpPacket,
    vlan::VlanPacket,
    Packet as PnetPacket,
};
use std::net::IpAddr;

use crate::models::packet::{DecodedPacket, NetworkLayer, TransportLayer};

const SLL_HEADER_LEN: usize = 16;
const NULL_HEADER_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;

// BSD loopback address family values for IPv6 differ across platforms
const BSD_AF_INET: u32 = 2;
const BSD_AF_INET6: [u32; 3] = [24, 28, 30];

/// Link-layer framing of captured data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    /// Linux "cooked" capture (the `any` device)
    LinuxSll,
    /// BSD loopback, family in host byte order
    Null,
    /// OpenBSD loopback, family in network byte order
    Loop,
    /// Bare IPv4/IPv6 with no link header
    RawIp,
    Unsupported(i32),
}

impl LinkType {
    /// Map a pcap DLT value
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            1 => LinkType::Ethernet,
            113 => LinkType::LinuxSll,
            0 => LinkType::Null,
            108 => LinkType::Loop,
            12 | 14 | 101 => LinkType::RawIp,
            other => LinkType::Unsupported(other),
        }
    }
}

/// Per-frame metadata from the capture header
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub captured_at: Option<DateTime<Utc>>,
    pub wire_length: u32,
    pub captured_length: u32,
}

/// Decodes raw frames into layered packet views
pub struct FrameParser {
    link_type: LinkType,
}

impl FrameParser {
    pub fn new(link_type: LinkType) -> Self {
        Self { link_type }
    }

    /// Decode one frame. Never fails: layers that cannot be decoded are left absent.
    pub fn parse(&self, data: &[u8], header: FrameHeader) -> DecodedPacket {
        let mut packet = DecodedPacket {
            captured_at: header.captured_at,
            wire_length: Some(header.wire_length),
            captured_length: header.captured_length,
            network: None,
            transport: None,
        };

        match self.link_type {
            LinkType::Ethernet => self.parse_ethernet(data, &mut packet),
            LinkType::LinuxSll => {
                if data.len() >= SLL_HEADER_LEN {
                    let ethertype = EtherType(u16::from_be_bytes([data[14], data[15]]));
                    self.parse_ethertype(ethertype, &data[SLL_HEADER_LEN..], &mut packet);
                }
            }
            LinkType::Null | LinkType::Loop => {
                if data.len() >= NULL_HEADER_LEN {
                    let raw = [data[0], data[1], data[2], data[3]];
                    let family = if self.link_type == LinkType::Null {
                        u32::from_ne_bytes(raw)
                    } else {
                        u32::from_be_bytes(raw)
                    };
                    let payload = &data[NULL_HEADER_LEN..];
                    if family == BSD_AF_INET {
                        self.parse_ipv4(payload, &mut packet);
                    } else if BSD_AF_INET6.contains(&family) {
                        self.parse_ipv6(payload, &mut packet);
                    }
                }
            }
            LinkType::RawIp => self.parse_raw_ip(data, &mut packet),
            LinkType::Unsupported(dlt) => {
                if log_enabled!(Level::Trace) {
                    trace!("Unsupported link type {}, frame left undecoded", dlt);
                }
            }
        }

        packet
    }

    fn parse_ethernet(&self, data: &[u8], packet: &mut DecodedPacket) {
        let eth_packet = match EthernetPacket::new(data) {
            Some(eth) => eth,
            None => return,
        };

        if log_enabled!(Level::Trace) {
            trace!(
                "EtherType: {:?}, src: {}, dst: {}",
                eth_packet.get_ethertype(),
                eth_packet.get_source(),
                eth_packet.get_destination()
            );
        }

        self.parse_ethertype(eth_packet.get_ethertype(), eth_packet.payload(), packet);
    }

    fn parse_ethertype(&self, ethertype: EtherType, payload: &[u8], packet: &mut DecodedPacket) {
        match ethertype {
            EtherTypes::Ipv4 => self.parse_ipv4(payload, packet),
            EtherTypes::Ipv6 => self.parse_ipv6(payload, packet),
            EtherTypes::Vlan => {
                if let Some(vlan) = VlanPacket::new(payload) {
                    self.parse_ethertype(vlan.get_ethertype(), vlan.payload(), packet);
                }
            }
            _ => {}
        }
    }

    fn parse_raw_ip(&self, data: &[u8], packet: &mut DecodedPacket) {
        match data.first().map(|b| b >> 4) {
            Some(4) => self.parse_ipv4(data, packet),
            Some(6) => self.parse_ipv6(data, packet),
            _ => {}
        }
    }

    /// Parse IPv4 packet
    fn parse_ipv4(&self, data: &[u8], packet: &mut DecodedPacket) {
        let ipv4_packet = match Ipv4Packet::new(data) {
            Some(ip) => ip,
            None => return,
        };

        packet.network = Some(NetworkLayer {
            source: IpAddr::V4(ipv4_packet.get_source()),
            destination: IpAddr::V4(ipv4_packet.get_destination()),
        });

        let header_len = ipv4_packet.get_header_length() as usize * 4;
        if header_len < IPV4_MIN_HEADER_LEN || header_len > data.len() {
            return;
        }

        // Only the first fragment carries the transport header
        if ipv4_packet.get_fragment_offset() != 0 {
            return;
        }

        let end = (ipv4_packet.get_total_length() as usize).clamp(header_len, data.len());
        self.parse_transport(ipv4_packet.get_next_level_protocol(), &data[header_len..end], packet);
    }

    /// Parse IPv6 packet
    fn parse_ipv6(&self, data: &[u8], packet: &mut DecodedPacket) {
        let ipv6_packet = match Ipv6Packet::new(data) {
            Some(ip) => ip,
            None => return,
        };

        packet.network = Some(NetworkLayer {
            source: IpAddr::V6(ipv6_packet.get_source()),
            destination: IpAddr::V6(ipv6_packet.get_destination()),
        });

        self.parse_transport(ipv6_packet.get_next_header(), ipv6_packet.payload(), packet);
    }

    /// Parse transport layer protocols
    fn parse_transport(&self, proto: IpNextHeaderProtocol, data: &[u8], packet: &mut DecodedPacket) {
        if log_enabled!(Level::Trace) {
            trace!("Transport protocol: {:?}, data length: {}", proto, data.len());
        }

        let (label, ports) = match proto {
            IpNextHeaderProtocols::Tcp => (
                "TCP",
                TcpPacket::new(data).map(|tcp| (tcp.get_source(), tcp.get_destination())),
            ),
            IpNextHeaderProtocols::Udp => (
                "UDP",
                UdpPacket::new(data).map(|udp| (udp.get_source(), udp.get_destination())),
            ),
            _ => return,
        };

        packet.transport = Some(TransportLayer {
            protocol: label.to_string(),
            source_port: ports.map(|(src, _)| src),
            destination_port: ports.map(|(_, dst)| dst),
        });
    }
}
