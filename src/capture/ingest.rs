use log::{debug, error, info, log_enabled, trace, Level};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

use crate::capture::extractor::FeatureExtractor;
use crate::capture::source::{PacketSource, PcapSource, SourceEvent};
use crate::capture::store::AggregationStore;
use crate::models::config::AppConfig;
use crate::models::stats::IngestStats;
use crate::utils::error::{AppError, AppResult};

/// Lifecycle of a live ingestion session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    Idle,
    Capturing,
    Stopped,
    Failed,
}

impl IngestState {
    /// Stopped and Failed are final; a new session must be started from Idle
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestState::Stopped | IngestState::Failed)
    }
}

/// State shared between the ingestion thread and its handle
struct Shared {
    state: Mutex<IngestState>,
    failure: Mutex<Option<AppError>>,
    stop: AtomicBool,
    received: AtomicU64,
    appended: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn stats(&self) -> IngestStats {
        IngestStats {
            received: self.received.load(Ordering::Relaxed),
            appended: self.appended.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Drives a packet source into the aggregation store on a dedicated thread
pub struct IngestionLoop;

impl IngestionLoop {
    /// Open a live pcap source and start ingesting from it.
    ///
    /// Interface errors at open time are returned here, before any thread exists.
    pub fn open_and_start(
        config: &AppConfig,
        interface: &str,
        store: Arc<AggregationStore>,
    ) -> AppResult<IngestionHandle> {
        let source = PcapSource::open_live(config, interface)?;
        Ok(Self::start(source, store))
    }

    /// Start ingesting from an already opened source
    pub fn start<S>(source: S, store: Arc<AggregationStore>) -> IngestionHandle
    where
        S: PacketSource + 'static,
    {
        let session_id = Uuid::new_v4();
        let interface = source.interface().to_string();
        let shared = Arc::new(Shared {
            state: Mutex::new(IngestState::Idle),
            failure: Mutex::new(None),
            stop: AtomicBool::new(false),
            received: AtomicU64::new(0),
            appended: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        *shared.state.lock() = IngestState::Capturing;
        info!("Ingestion session {} capturing on {}", session_id, interface);

        let thread_shared = shared.clone();
        let thread = thread::Builder::new()
            .name(format!("ingest-{}", interface))
            .spawn(move || Self::run(source, store, thread_shared, session_id));

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn ingestion thread: {}", e);
                *shared.state.lock() = IngestState::Failed;
                *shared.failure.lock() = Some(AppError::DeviceFailure {
                    interface: interface.clone(),
                    reason: format!("failed to spawn ingestion thread: {}", e),
                });
                None
            }
        };

        IngestionHandle {
            session_id,
            interface,
            shared,
            thread: Mutex::new(thread),
        }
    }

    fn run<S: PacketSource>(
        mut source: S,
        store: Arc<AggregationStore>,
        shared: Arc<Shared>,
        session_id: Uuid,
    ) -> AppResult<IngestStats> {
        let extractor = FeatureExtractor::new();

        loop {
            if shared.stop.load(Ordering::SeqCst) {
                info!("Stop requested for ingestion session {}", session_id);
                break;
            }

            match source.next_event() {
                Ok(SourceEvent::Packet(packet)) => {
                    shared.received.fetch_add(1, Ordering::Relaxed);
                    match extractor.extract(&packet) {
                        Some(record) => {
                            store.append(record);
                            shared.appended.fetch_add(1, Ordering::Relaxed);
                        }
                        None => {
                            shared.dropped.fetch_add(1, Ordering::Relaxed);
                            if log_enabled!(Level::Trace) {
                                trace!("Packet produced no record, skipping");
                            }
                        }
                    }
                }
                Ok(SourceEvent::Idle) => continue,
                Ok(SourceEvent::Closed) => {
                    info!("Capture device {} closed", source.interface());
                    break;
                }
                Err(e) => {
                    error!("Ingestion session {} failed: {}", session_id, e);
                    *shared.failure.lock() = Some(e.clone());
                    *shared.state.lock() = IngestState::Failed;
                    return Err(e);
                }
            }
        }

        *shared.state.lock() = IngestState::Stopped;
        let stats = shared.stats();
        info!(
            "Ingestion session {} stopped: {} received, {} appended, {} dropped",
            session_id, stats.received, stats.appended, stats.dropped
        );
        Ok(stats)
    }
}

/// Control and status handle for a running ingestion session
pub struct IngestionHandle {
    session_id: Uuid,
    interface: String,
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<AppResult<IngestStats>>>>,
}

impl IngestionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn state(&self) -> IngestState {
        *self.shared.state.lock()
    }

    pub fn stats(&self) -> IngestStats {
        self.shared.stats()
    }

    /// Message of the error that failed the session, if any
    pub fn failure(&self) -> Option<String> {
        self.shared.failure.lock().as_ref().map(|e| e.to_string())
    }

    /// Ask the loop to stop before its next read
    pub fn stop(&self) {
        debug!("Requesting stop of ingestion session {}", self.session_id);
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the loop to finish and surface its result.
    ///
    /// Blocks for up to one source read timeout after `stop`. Later calls
    /// return the recorded outcome without blocking.
    pub fn join(&self) -> AppResult<IngestStats> {
        let thread = self.thread.lock().take();
        match thread {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            },
            None => match self.shared.failure.lock().as_ref() {
                Some(e) => Err(e.clone()),
                None => Ok(self.stats()),
            },
        }
    }
}
