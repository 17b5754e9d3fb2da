use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::source::{PacketSource, PcapSource};
use crate::models::config::{AppConfig, DEFAULT_OUTPUT_FILENAME};
use crate::utils::error::{AppError, AppResult};

const PCAP_EXTENSION: &str = ".pcap";

/// Coerce a user-supplied packet count to a positive integer.
/// Integral decimal text such as "10.0" is accepted; exponent forms are not.
pub fn parse_count(text: &str) -> AppResult<usize> {
    let trimmed = text.trim();
    let count = match trimmed.parse::<usize>() {
        Ok(n) => n,
        Err(_) => integral_decimal(trimmed).ok_or_else(|| AppError::InvalidCount(text.to_string()))?,
    };

    if count == 0 {
        return Err(AppError::InvalidCount(text.to_string()));
    }
    Ok(count)
}

/// "<digits>.<zeros>" as its integer part
fn integral_decimal(text: &str) -> Option<usize> {
    let (whole, fraction) = text.split_once('.')?;
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b == b'0') {
        return None;
    }
    whole.parse().ok()
}

/// Resolve `filename` inside `dir`, adding the `.pcap` extension when missing.
/// `dir` is created if it does not exist.
pub fn normalize_output_path(dir: &Path, filename: &str) -> AppResult<PathBuf> {
    let filename = filename.trim();
    let mut name = if filename.is_empty() {
        DEFAULT_OUTPUT_FILENAME.to_string()
    } else {
        filename.to_string()
    };
    if !name.ends_with(PCAP_EXTENSION) {
        name.push_str(PCAP_EXTENSION);
    }

    fs::create_dir_all(dir)?;
    Ok(dir.join(name))
}

/// Count-terminated capture straight to a pcap file
#[derive(Debug, Clone)]
pub struct BulkCaptureSession {
    interface: String,
    count: usize,
    output_path: PathBuf,
}

impl BulkCaptureSession {
    /// Validate the count and prepare the output path without touching the device
    pub fn new(interface: &str, count: &str, output_dir: &Path, filename: &str) -> AppResult<Self> {
        let count = parse_count(count)?;
        let output_path = normalize_output_path(output_dir, filename)?;
        Ok(Self {
            interface: interface.to_string(),
            count,
            output_path,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Open the configured interface and run the capture on it
    pub fn open_and_run(&self, config: &AppConfig) -> AppResult<PathBuf> {
        let mut source = PcapSource::open_live(config, &self.interface)?;
        self.run(&mut source)
    }

    /// Capture exactly `count` packets from `source` into the output file
    pub fn run<S: PacketSource>(&self, source: &mut S) -> AppResult<PathBuf> {
        println!("Capturing {} packets on interface {}", self.count, self.interface);
        info!(
            "Bulk capture started: {} packets on {} -> {}",
            self.count,
            self.interface,
            self.output_path.display()
        );

        match source.capture_bounded(self.count, &self.output_path) {
            Ok(written) => {
                println!(
                    "Capture complete. Saved {} packets to {}",
                    written,
                    self.output_path.display()
                );
                info!("Bulk capture completed: {} packets written", written);
                Ok(self.output_path.clone())
            }
            Err(e) => {
                error!(
                    "Bulk capture to {} failed, output is incomplete: {}",
                    self.output_path.display(),
                    e
                );
                Err(e)
            }
        }
    }
}
