use actix_web::{web, HttpResponse, Responder};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::ApiState;
use crate::models::packet::PacketRecord;
use crate::models::stats::{IpPairCount, PortUsage};

/// Query parameters for the history tail
#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize { 2000 }

/// Ordering of the port usage table
#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortOrder {
    #[default]
    Desc,
    Asc,
}

#[derive(Deserialize)]
pub struct PortsQuery {
    #[serde(default)]
    order: PortOrder,
}

#[derive(Serialize)]
struct HistoryResponse {
    records: Vec<PacketRecord>,
    limit: usize,
}

#[derive(Serialize)]
struct PortsResponse {
    ports: Vec<PortUsage>,
}

#[derive(Serialize)]
struct IpPairRow {
    ip_pair: String,
    #[serde(flatten)]
    pair: IpPairCount,
}

/// Most recent records, oldest first
pub async fn get_history(
    state: web::Data<ApiState>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    let records = state.facade.recent_history(query.limit);
    debug!("Serving {} history records (limit {})", records.len(), query.limit);
    HttpResponse::Ok().json(HistoryResponse {
        records,
        limit: query.limit,
    })
}

/// Largest frame length per transport protocol
pub async fn get_max_length(state: web::Data<ApiState>) -> impl Responder {
    let max: BTreeMap<String, u32> = state.facade.max_length_by_protocol().into_iter().collect();
    HttpResponse::Ok().json(max)
}

/// Port usage table
pub async fn get_ports(
    state: web::Data<ApiState>,
    query: web::Query<PortsQuery>,
) -> impl Responder {
    let ports = state.facade.port_usage_count(query.order == PortOrder::Desc);
    HttpResponse::Ok().json(PortsResponse { ports })
}

/// Source -> destination table
pub async fn get_ip_pairs(state: web::Data<ApiState>) -> impl Responder {
    let rows: Vec<IpPairRow> = state
        .facade
        .ip_pair_counts()
        .into_iter()
        .map(|pair| IpPairRow { ip_pair: pair.label(), pair })
        .collect();
    HttpResponse::Ok().json(rows)
}
