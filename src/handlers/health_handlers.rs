//! Health & service-info handlers.
//!
//! - GET /health -> aggregated dependency health, always 200
//! - GET /       -> service metadata and endpoint map

use crate::{models::health::AggregatedHealth, services::gateway_service::GatewayService};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /health`
///
/// Probes object storage and the embedding provider. The HTTP status is
/// always 200; the body's `status` field carries the verdict.
pub async fn health(State(service): State<GatewayService>) -> impl IntoResponse {
    let report: AggregatedHealth = service.check_health().await;
    (StatusCode::OK, Json(report))
}

/// `GET /`
pub async fn service_info(State(service): State<GatewayService>) -> impl IntoResponse {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: service.environment().as_str(),
        embedding_service: service.embedder().describe().to_string(),
        endpoints: Endpoints {
            upload: "/api/upload",
            embedding: "/api/embeddings/generate",
            batch_embedding: "/api/embeddings/batch",
            health: "/health",
        },
    })
}

#[derive(Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    environment: &'static str,
    embedding_service: String,
    endpoints: Endpoints,
}

#[derive(Serialize)]
struct Endpoints {
    upload: &'static str,
    embedding: &'static str,
    batch_embedding: &'static str,
    health: &'static str,
}
