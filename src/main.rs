mod api;
mod capture;
mod models;
mod utils;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::console::{self, ConsoleOptions};
use crate::api::{routes, ApiState};
use crate::capture::bulk::BulkCaptureSession;
use crate::capture::ingest::IngestionLoop;
use crate::capture::interfaces;
use crate::capture::query::QueryFacade;
use crate::capture::store::AggregationStore;
use crate::models::config::{AppConfig, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FILENAME};
use crate::utils::logging;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Live network traffic aggregation and capture")]
struct Cli {
    /// Log level (trace, debug, info, warn, error, off)
    #[clap(long, default_value = "info", global = true)]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sniff an interface and show live traffic aggregates
    Dashboard(DashboardArgs),

    /// List network interfaces and their addresses
    Interface,

    /// Capture a fixed number of packets to a pcap file
    Output(OutputArgs),
}

#[derive(clap::Args, Debug)]
struct CaptureArgs {
    /// Interface to sniff
    #[clap(short, long)]
    interface: String,

    /// Enable promiscuous mode
    #[clap(short = 'P', long)]
    promiscuous: bool,

    /// Bytes captured per frame
    #[clap(long, default_value = "65535")]
    snaplen: i32,

    /// Read timeout in milliseconds
    #[clap(long, default_value = "1000")]
    timeout_ms: i32,

    /// BPF filter expression
    #[clap(long)]
    filter: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DashboardArgs {
    #[clap(flatten)]
    capture: CaptureArgs,

    /// Serve the read-only query API on this port
    #[clap(short, long)]
    port: Option<u16>,

    /// Keep only this many records of history (unbounded by default)
    #[clap(long)]
    history_capacity: Option<usize>,

    /// Dashboard refresh interval in seconds
    #[clap(long, default_value = "2")]
    poll_interval: u64,

    /// Recent packets shown on the dashboard
    #[clap(long, default_value = "15")]
    history_rows: usize,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    #[clap(flatten)]
    capture: CaptureArgs,

    /// Output file
    #[clap(long, default_value = DEFAULT_OUTPUT_FILENAME)]
    filename: String,

    /// Number of packets to capture
    #[clap(long, default_value = "10")]
    count: String,

    /// Directory for capture files
    #[clap(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
}

impl CaptureArgs {
    fn to_config(&self) -> AppConfig {
        AppConfig {
            interface: Some(self.interface.clone()),
            promiscuous: self.promiscuous,
            snaplen: self.snaplen,
            timeout_ms: self.timeout_ms,
            filter: self.filter.clone(),
            ..AppConfig::default()
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logger(logging::get_log_level(&cli.log_level));

    info!("Starting MyrMyr v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Interface => {
            interfaces::print_interfaces();
            Ok(())
        }
        Command::Output(args) => run_output(args).await,
        Command::Dashboard(args) => run_dashboard(args).await,
    }
}

async fn run_output(args: OutputArgs) -> Result<()> {
    let config = AppConfig {
        output_dir: args.output_dir.clone(),
        ..args.capture.to_config()
    };
    config.validate()?;

    let session = BulkCaptureSession::new(&args.capture.interface, &args.count, &config.output_dir, &args.filename)?;
    let path = tokio::task::spawn_blocking(move || session.open_and_run(&config)).await??;
    info!("Capture saved to {}", path.display());
    Ok(())
}

async fn run_dashboard(args: DashboardArgs) -> Result<()> {
    let config = AppConfig {
        history_capacity: args.history_capacity,
        poll_interval_secs: args.poll_interval,
        api_port: args.port,
        ..args.capture.to_config()
    };
    config.validate()?;

    let store = Arc::new(match config.history_capacity {
        Some(capacity) => AggregationStore::with_capacity(capacity),
        None => AggregationStore::new(),
    });

    let ingestion = match IngestionLoop::open_and_start(&config, &args.capture.interface, store.clone()) {
        Ok(handle) => Arc::new(handle),
        Err(e) => {
            error!("Cannot start capture: {}", e);
            return Err(e.into());
        }
    };
    let facade = QueryFacade::new(store);

    let server = match config.api_port {
        Some(port) => {
            let state = web::Data::new(ApiState {
                facade: facade.clone(),
                ingestion: ingestion.clone(),
            });
            let bound = HttpServer::new(move || {
                App::new()
                    .app_data(state.clone())
                    .configure(routes::configure)
            })
            .bind(("127.0.0.1", port));

            match bound {
                Ok(server) => {
                    info!("Serving query API on http://127.0.0.1:{}", port);
                    let server = server.run();
                    let handle = server.handle();
                    actix_rt::spawn(server);
                    Some(handle)
                }
                Err(e) => {
                    error!("Failed to bind query API on port {}: {}", port, e);
                    ingestion.stop();
                    return Err(e.into());
                }
            }
        }
        None => None,
    };

    let options = ConsoleOptions {
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        history_rows: args.history_rows,
        clear_screen: std::io::stdout().is_terminal(),
        ..ConsoleOptions::default()
    };
    let result = console::run(facade, ingestion, options).await;

    if let Some(handle) = server {
        handle.stop(true).await;
    }

    result
}
