use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use pcap::{Active, Capture, Device};
use std::path::Path;

use crate::capture::parser::{FrameHeader, FrameParser, LinkType};
use crate::models::config::AppConfig;
use crate::models::packet::DecodedPacket;
use crate::utils::error::{AppError, AppResult};

/// What a single read from a packet source produced
#[derive(Debug)]
pub enum SourceEvent {
    /// A decoded packet
    Packet(DecodedPacket),
    /// The read timed out with no traffic; the source is still open
    Idle,
    /// The device will produce no further packets
    Closed,
}

/// A capture device yielding decoded packets
pub trait PacketSource: Send {
    /// Name of the interface this source reads from
    fn interface(&self) -> &str;

    /// Block until the next packet, a read timeout, or device closure
    fn next_event(&mut self) -> AppResult<SourceEvent>;

    /// Capture exactly `count` frames into a pcap file at `output`.
    /// Returns the number of frames written, which always equals `count`.
    fn capture_bounded(&mut self, count: usize, output: &Path) -> AppResult<usize>;
}

/// libpcap-backed live capture
pub struct PcapSource {
    interface: String,
    capture: Capture<Active>,
    parser: FrameParser,
}

impl PcapSource {
    /// Open a live capture on `interface` using the capture settings in `config`
    pub fn open_live(config: &AppConfig, interface: &str) -> AppResult<Self> {
        info!("Opening live capture on interface: {}", interface);

        let devices = Device::list().map_err(|e| AppError::DeviceFailure {
            interface: interface.to_string(),
            reason: format!("failed to list capture devices: {}", e),
        })?;

        let device = devices
            .into_iter()
            .find(|d| d.name == interface)
            .ok_or_else(|| AppError::InterfaceNotFound { interface: interface.to_string() })?;

        debug!(
            "Found device {} ({})",
            device.name,
            device.desc.as_deref().unwrap_or("no description")
        );

        let mut capture = Capture::from_device(device)
            .map_err(|e| open_error(interface, e))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .open()
            .map_err(|e| open_error(interface, e))?;

        if let Some(filter) = &config.filter {
            match capture.filter(filter.as_str(), true) {
                Ok(_) => info!("Filter applied successfully: {}", filter),
                Err(e) => warn!("Failed to apply filter '{}': {}", filter, e),
            }
        }

        let link_type = LinkType::from_dlt(capture.get_datalink().0);
        if let LinkType::Unsupported(dlt) = link_type {
            warn!("Link type {} on {} is not decoded; packets will not be aggregated", dlt, interface);
        }
        info!("Capture opened on {} with link type {:?}", interface, link_type);

        Ok(Self {
            interface: interface.to_string(),
            capture,
            parser: FrameParser::new(link_type),
        })
    }
}

impl PacketSource for PcapSource {
    fn interface(&self) -> &str {
        &self.interface
    }

    fn next_event(&mut self) -> AppResult<SourceEvent> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = FrameHeader {
                    captured_at: header_timestamp(packet.header.ts.tv_sec as i64, packet.header.ts.tv_usec as i64),
                    wire_length: packet.header.len,
                    captured_length: packet.header.caplen,
                };
                Ok(SourceEvent::Packet(self.parser.parse(packet.data, header)))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(SourceEvent::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(SourceEvent::Closed),
            Err(e) => {
                error!("Error capturing packet on {}: {}", self.interface, e);
                Err(device_failure(&self.interface, e))
            }
        }
    }

    fn capture_bounded(&mut self, count: usize, output: &Path) -> AppResult<usize> {
        let mut savefile = self.capture.savefile(output).map_err(|e| AppError::OutputFile {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut written = 0;
        while written < count {
            match self.capture.next_packet() {
                Ok(packet) => {
                    savefile.write(&packet);
                    written += 1;
                    debug!("Saved frame {}/{} ({} bytes)", written, count, packet.header.len);
                }
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => {
                    return Err(AppError::DeviceFailure {
                        interface: self.interface.clone(),
                        reason: format!("device closed after {} of {} packets", written, count),
                    });
                }
                Err(e) => return Err(device_failure(&self.interface, e)),
            }
        }

        savefile.flush().map_err(|e| AppError::OutputFile {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(written)
    }
}

/// Convert a pcap timeval; None when the header carries an unrepresentable time
fn header_timestamp(secs: i64, micros: i64) -> Option<DateTime<Utc>> {
    if !(0..1_000_000).contains(&micros) {
        return None;
    }
    DateTime::from_timestamp(secs, micros as u32 * 1000)
}

fn device_failure(interface: &str, e: pcap::Error) -> AppError {
    AppError::DeviceFailure {
        interface: interface.to_string(),
        reason: e.to_string(),
    }
}

/// Classify a failure to open the device
fn open_error(interface: &str, e: pcap::Error) -> AppError {
    let reason = e.to_string();
    let lowered = reason.to_lowercase();
    if lowered.contains("permission") || lowered.contains("not permitted") {
        AppError::PermissionDenied {
            interface: interface.to_string(),
            reason,
        }
    } else if lowered.contains("no such device") {
        AppError::InterfaceNotFound { interface: interface.to_string() }
    } else {
        AppError::DeviceFailure {
            interface: interface.to_string(),
            reason,
        }
    }
}
