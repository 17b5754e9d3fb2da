use anyhow::Result;
use crossterm::{cursor::MoveTo, execute, terminal::{Clear, ClearType}};
use log::{info, warn};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::capture::ingest::{IngestState, IngestionHandle};
use crate::capture::query::{port_rows, ranked_pairs, QueryFacade};

const BAR_WIDTH: usize = 40;

/// Layout and cadence of the terminal dashboard
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub poll_interval: Duration,
    /// Rows of recent traffic shown
    pub history_rows: usize,
    /// Rows shown in the port and address pair tables
    pub top_rows: usize,
    pub clear_screen: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            history_rows: 15,
            top_rows: 10,
            clear_screen: true,
        }
    }
}

/// Poll the query facade on a fixed interval until Ctrl-C or the end of ingestion,
/// then stop the session and surface how it ended.
pub async fn run(facade: QueryFacade, ingestion: Arc<IngestionHandle>, options: ConsoleOptions) -> Result<()> {
    let mut ticker = tokio::time::interval(options.poll_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                draw(&facade, &ingestion, &options)?;
                if ingestion.state().is_terminal() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupt received, stopping capture");
                break;
            }
        }
    }

    ingestion.stop();
    let handle = ingestion.clone();
    let stats = tokio::task::spawn_blocking(move || handle.join()).await??;
    info!(
        "Capture finished: {} packets received, {} aggregated, {} skipped",
        stats.received, stats.appended, stats.dropped
    );
    Ok(())
}

fn draw(facade: &QueryFacade, ingestion: &IngestionHandle, options: &ConsoleOptions) -> io::Result<()> {
    if options.clear_screen {
        if let Err(e) = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0)) {
            warn!("Failed to clear terminal: {}", e);
        }
    }
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    render(&mut stdout, facade, ingestion, options)?;
    stdout.flush()
}

fn heading<W: WriteColor>(out: &mut W, title: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    writeln!(out, "\n{}", title)?;
    out.reset()
}

/// Render one dashboard frame. Every section comes from a single store snapshot.
pub fn render<W: WriteColor>(
    out: &mut W,
    facade: &QueryFacade,
    ingestion: &IngestionHandle,
    options: &ConsoleOptions,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "Real-Time Network Traffic Monitoring")?;
    out.reset()?;

    let state = ingestion.state();
    let state_color = match state {
        IngestState::Capturing => Color::Green,
        IngestState::Failed => Color::Red,
        IngestState::Idle | IngestState::Stopped => Color::Yellow,
    };
    write!(out, "Interface {} | session {} | ", ingestion.interface(), ingestion.session_id())?;
    out.set_color(ColorSpec::new().set_fg(Some(state_color)))?;
    writeln!(out, "{:?}", state)?;
    out.reset()?;

    let stats = ingestion.stats();
    writeln!(
        out,
        "Packets: {} received, {} aggregated, {} skipped",
        stats.received, stats.appended, stats.dropped
    )?;
    if let Some(failure) = ingestion.failure() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(out, "Error: {}", failure)?;
        out.reset()?;
    }

    let snapshot = facade.snapshot(options.history_rows);

    heading(out, "Network Traffic Over Time")?;
    let recent = &snapshot.history;
    if recent.is_empty() {
        writeln!(out, "No data yet")?;
    }
    for record in recent {
        writeln!(
            out,
            "{}  {:<4} {:>6}  {} -> {}",
            record.captured_at.format("%H:%M:%S%.3f"),
            record.transport_protocol.as_deref().unwrap_or("-"),
            record.frame_length.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
            endpoint(record.source_address.as_deref(), record.source_port),
            endpoint(record.destination_address.as_deref(), record.destination_port),
        )?;
    }

    heading(out, "Maximum Packet Length by Protocol")?;
    let mut max_lengths: Vec<(String, u32)> = snapshot.max_length_by_protocol.into_iter().collect();
    max_lengths.sort();
    let longest = max_lengths.iter().map(|(_, len)| *len).max().unwrap_or(0).max(1);
    for (protocol, length) in &max_lengths {
        let bar = "#".repeat((*length as usize * BAR_WIDTH).div_ceil(longest as usize));
        writeln!(out, "{:<6} {:>6} {}", protocol, length, bar)?;
    }

    heading(out, "Port Usage")?;
    writeln!(out, "{:>11} {:>12}", "Port Number", "Usage Count")?;
    for row in port_rows(snapshot.port_usage_count, true).iter().take(options.top_rows) {
        writeln!(out, "{:>11} {:>12}", row.port, row.usage_count)?;
    }

    heading(out, "Source -> Destination IP Pair")?;
    for pair in ranked_pairs(snapshot.ip_pair_counts).iter().take(options.top_rows) {
        writeln!(out, "{:<48} {:>8}", pair.label(), pair.count)?;
    }

    Ok(())
}

fn endpoint(address: Option<&str>, port: Option<u16>) -> String {
    match (address, port) {
        (Some(addr), Some(port)) if addr.contains(':') => format!("[{}]:{}", addr, port),
        (Some(addr), Some(port)) => format!("{}:{}", addr, port),
        (Some(addr), None) => addr.to_string(),
        (None, Some(port)) => format!("?:{}", port),
        (None, None) => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ingest::IngestionLoop;
    use crate::capture::source::testing::ScriptedSource;
    use crate::capture::store::tests::record;
    use crate::capture::store::AggregationStore;
    use termcolor::Buffer;

    #[test]
    fn test_render_frame() {
        let store = Arc::new(AggregationStore::new());
        store.append(record("TCP", 1500, Some(443), Some(50000)));
        store.append(record("UDP", 75, Some(53), Some(53)));
        let ingestion = IngestionLoop::start(ScriptedSource::new(Vec::new()), store.clone());
        let _ = ingestion.join();

        let mut buffer = Buffer::no_color();
        render(&mut buffer, &QueryFacade::new(store), &ingestion, &ConsoleOptions::default()).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();

        assert!(text.contains("Real-Time Network Traffic Monitoring"));
        assert!(text.contains("10.0.0.1:443 -> 10.0.0.2:50000"));
        assert!(text.contains(&format!("TCP      1500 {}", "#".repeat(BAR_WIDTH))));
        assert!(text.contains("10.0.0.1 -> 10.0.0.2"));
        assert!(text.contains("Stopped"));
    }

    #[test]
    fn test_render_limits_rows() {
        let store = Arc::new(AggregationStore::new());
        for port in 1..=5u16 {
            store.append(record("TCP", 60, Some(port), Some(9000)));
        }
        let ingestion = IngestionLoop::start(ScriptedSource::new(Vec::new()), store.clone());
        let _ = ingestion.join();

        let options = ConsoleOptions {
            history_rows: 2,
            top_rows: 1,
            ..ConsoleOptions::default()
        };
        let mut buffer = Buffer::no_color();
        render(&mut buffer, &QueryFacade::new(store), &ingestion, &options).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();

        assert!(!text.contains("10.0.0.1:3 -> "));
        assert!(text.contains("10.0.0.1:4 -> 10.0.0.2:9000"));
        assert!(text.contains("10.0.0.1:5 -> 10.0.0.2:9000"));
        assert!(text.contains(&format!("{:>11} {:>12}", 9000, 5)));
        assert!(!text.contains(&format!("{:>11} {:>12}", 1, 1)));
        assert!(text.contains(&format!("{:<48} {:>8}", "10.0.0.1 -> 10.0.0.2", 5)));
    }

    #[test]
    fn test_render_empty_store() {
        let store = Arc::new(AggregationStore::new());
        let ingestion = IngestionLoop::start(ScriptedSource::new(Vec::new()), store.clone());
        let _ = ingestion.join();

        let mut buffer = Buffer::no_color();
        render(&mut buffer, &QueryFacade::new(store), &ingestion, &ConsoleOptions::default()).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(text.contains("No data yet"));
    }

    #[test]
    fn test_endpoint_formatting() {
        assert_eq!(endpoint(Some("10.0.0.1"), Some(80)), "10.0.0.1:80");
        assert_eq!(endpoint(Some("fe80::1"), Some(53)), "[fe80::1]:53");
        assert_eq!(endpoint(None, Some(80)), "?:80");
        assert_eq!(endpoint(None, None), "?");
    }
}
