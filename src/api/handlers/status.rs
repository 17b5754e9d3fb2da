use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use uuid::Uuid;

use crate::api::ApiState;
use crate::capture::ingest::IngestState;
use crate::models::stats::{HistorySummary, IngestStats};

/// Response for ingestion status
#[derive(Serialize)]
struct StatusResponse {
    state: IngestState,
    interface: String,
    session_id: Uuid,
    stats: IngestStats,
    failure: Option<String>,
    summary: HistorySummary,
}

/// Ingestion session status
pub async fn get_status(state: web::Data<ApiState>) -> impl Responder {
    let ingestion = &state.ingestion;
    HttpResponse::Ok().json(StatusResponse {
        state: ingestion.state(),
        interface: ingestion.interface().to_string(),
        session_id: ingestion.session_id(),
        stats: ingestion.stats(),
        failure: ingestion.failure(),
        summary: state.facade.summary(),
    })
}
