use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use crate::api::handlers::{
    query::{
        get_history,
        get_ip_pairs,
        get_max_length,
        get_ports,
    },
    status::get_status,
};

/// Root endpoint to provide information about the API
async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "MyrMyr API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Read-only view of live traffic aggregates",
        "endpoints": [
            {
                "path": "/api/history?limit={n}",
                "method": "GET",
                "description": "Most recent packet records, oldest first"
            },
            {
                "path": "/api/protocols/max-length",
                "method": "GET",
                "description": "Maximum frame length per transport protocol"
            },
            {
                "path": "/api/ports?order={desc|asc}",
                "method": "GET",
                "description": "Port usage counts"
            },
            {
                "path": "/api/ip-pairs",
                "method": "GET",
                "description": "Source -> destination address pair counts"
            },
            {
                "path": "/api/status",
                "method": "GET",
                "description": "Ingestion session status"
            }
        ]
    }))
}

/// Configure API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Root endpoint
        .route("/", web::get().to(index))
        .service(
            web::scope("/api")
                .route("/history", web::get().to(get_history))
                .route("/protocols/max-length", web::get().to(get_max_length))
                .route("/ports", web::get().to(get_ports))
                .route("/ip-pairs", web::get().to(get_ip_pairs))
                .route("/status", web::get().to(get_status))
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiState;
    use crate::capture::ingest::IngestionLoop;
    use crate::capture::query::QueryFacade;
    use crate::capture::source::testing::ScriptedSource;
    use crate::capture::store::tests::record;
    use crate::capture::store::AggregationStore;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    fn state() -> web::Data<ApiState> {
        let store = Arc::new(AggregationStore::new());
        store.append(record("TCP", 40, Some(80), Some(50000)));
        store.append(record("TCP", 60, Some(81), Some(50000)));
        store.append(record("UDP", 512, Some(53), Some(53)));

        let ingestion = IngestionLoop::start(ScriptedSource::new(Vec::new()), store.clone());
        let _ = ingestion.join();

        web::Data::new(ApiState {
            facade: QueryFacade::new(store),
            ingestion: Arc::new(ingestion),
        })
    }

    #[actix_web::test]
    async fn test_history_limit() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/history?limit=2").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let records = body["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["transport_protocol"], "UDP");
    }

    #[actix_web::test]
    async fn test_max_length_and_ports() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/protocols/max-length").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["TCP"], 60);
        assert_eq!(body["UDP"], 512);

        let req = test::TestRequest::get().uri("/api/ports").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let ports = body["ports"].as_array().unwrap();
        assert_eq!(ports[0]["port"], 53);
        assert_eq!(ports[0]["usage_count"], 2);

        let req = test::TestRequest::get().uri("/api/ports?order=asc").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ports"][0]["port"], 53);
        assert_eq!(body["ports"][3]["port"], 50000);
    }

    #[actix_web::test]
    async fn test_ip_pairs_and_status() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/ip-pairs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["ip_pair"], "10.0.0.1 -> 10.0.0.2");
        assert_eq!(body[0]["count"], 3);

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["state"], "stopped");
        assert_eq!(body["summary"]["total_appended"], 3);
    }
}
