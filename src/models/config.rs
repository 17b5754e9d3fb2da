use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Default directory for bulk capture output
pub const DEFAULT_OUTPUT_DIR: &str = "./data/pcap/";

/// Default bulk capture file name
pub const DEFAULT_OUTPUT_FILENAME: &str = "capture_output.pcap";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network interface to capture from
    pub interface: Option<String>,

    /// Enable promiscuous mode
    pub promiscuous: bool,

    /// Maximum bytes captured per frame
    pub snaplen: i32,

    /// pcap read timeout; also how often the ingestion loop checks for a stop request
    pub timeout_ms: i32,

    /// BPF filter expression
    pub filter: Option<String>,

    /// Number of history records to retain (unbounded when absent)
    pub history_capacity: Option<usize>,

    /// Dashboard refresh interval
    pub poll_interval_secs: u64,

    /// Port for the query HTTP API (disabled when absent)
    pub api_port: Option<u16>,

    /// Directory that receives bulk capture files
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interface: None,
            promiscuous: false,
            snaplen: 65535,
            timeout_ms: 1000,
            filter: None,
            history_capacity: None,
            poll_interval_secs: 2,
            api_port: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl AppConfig {
    /// Reject values that would make capture or polling meaningless
    pub fn validate(&self) -> AppResult<()> {
        if self.snaplen <= 0 {
            return Err(AppError::Config(format!("snaplen must be positive, got {}", self.snaplen)));
        }
        if self.timeout_ms <= 0 {
            return Err(AppError::Config(format!("timeout_ms must be positive, got {}", self.timeout_ms)));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs must be at least 1".to_string()));
        }
        if self.history_capacity == Some(0) {
            return Err(AppError::Config("history_capacity must be at least 1 when set".to_string()));
        }
        Ok(())
    }
}
