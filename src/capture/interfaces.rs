use log::info;
use pnet_datalink::NetworkInterface;
use std::net::IpAddr;

use crate::models::interface::{InterfaceAddress, InterfaceInfo};

/// Enumerate the host's network interfaces with their addresses
pub fn list_interfaces() -> Vec<InterfaceInfo> {
    let interfaces: Vec<InterfaceInfo> = pnet_datalink::interfaces().iter().map(to_info).collect();
    info!("Found {} network interfaces", interfaces.len());
    interfaces
}

/// Print every interface in the human-readable layout
pub fn print_interfaces() {
    for iface in list_interfaces() {
        println!("{}", iface.formatted_display());
    }
}

fn to_info(iface: &NetworkInterface) -> InterfaceInfo {
    let mut info = InterfaceInfo::new(iface.name.clone());

    if let Some(mac) = iface.mac {
        info.addresses.push(InterfaceAddress {
            address: mac.to_string(),
            family: "MAC".to_string(),
            netmask: None,
        });
    }

    for network in &iface.ips {
        let family = match network.ip() {
            IpAddr::V4(_) => "IPv4",
            IpAddr::V6(_) => "IPv6",
        };
        info.addresses.push(InterfaceAddress {
            address: network.ip().to_string(),
            family: family.to_string(),
            netmask: Some(network.mask().to_string()),
        });
    }

    info
}
