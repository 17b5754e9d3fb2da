pub mod console;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::capture::ingest::IngestionHandle;
use crate::capture::query::QueryFacade;

/// Shared state handed to every HTTP handler
pub struct ApiState {
    pub facade: QueryFacade,
    pub ingestion: Arc<IngestionHandle>,
}
