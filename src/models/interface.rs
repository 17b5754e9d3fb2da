use serde::{Serialize, Deserialize};

/// One address bound to an interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    pub address: String,

    /// Address family label (e.g., IPv4, IPv6, MAC)
    pub family: String,

    pub netmask: Option<String>,
}

/// Information about a network interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Device system name (used for capture operations)
    pub name: String,

    pub addresses: Vec<InterfaceAddress>,
}

impl InterfaceInfo {
    /// Create a new interface info with just the device name
    pub fn new(name: String) -> Self {
        Self {
            name,
            addresses: Vec::new(),
        }
    }

    /// Human-readable block: the name followed by one line per address
    pub fn formatted_display(&self) -> String {
        let mut out = format!("Interface: {}\n", self.name);
        for addr in &self.addresses {
            out.push_str(&format!(
                "  Address: {} | Family: {} | Netmask: {}\n",
                addr.address,
                addr.family,
                addr.netmask.as_deref().unwrap_or("None")
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_display() {
        let mut info = InterfaceInfo::new("eth0".to_string());
        info.addresses.push(InterfaceAddress {
            address: "192.168.1.10".to_string(),
            family: "IPv4".to_string(),
            netmask: Some("255.255.255.0".to_string()),
        });
        info.addresses.push(InterfaceAddress {
            address: "aa:bb:cc:dd:ee:ff".to_string(),
            family: "MAC".to_string(),
            netmask: None,
        });

        let text = info.formatted_display();
        assert!(text.starts_with("Interface: eth0\n"));
        assert!(text.contains("Address: 192.168.1.10 | Family: IPv4 | Netmask: 255.255.255.0"));
        assert!(text.contains("Family: MAC | Netmask: None"));
    }
}
