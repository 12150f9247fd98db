//! Defines the gateway's HTTP surface.
//!
//! ## Structure
//! - `GET  /`                        : service metadata
//! - `GET  /health`                  : aggregated dependency health
//! - `POST /api/upload`              : multipart file upload
//! - `POST /api/embeddings/generate` : embed one text
//! - `POST /api/embeddings/batch`    : embed many texts, order preserved

use crate::{
    handlers::{
        embedding_handlers::{generate_batch_embedding, generate_embedding},
        health_handlers::{health, service_info},
        upload_handlers::upload_file,
    },
    services::gateway_service::GatewayService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Build the router for all gateway routes.
///
/// The upload route's body limit follows the configured file ceiling; the
/// handler enforces the exact ceiling while reading.
pub fn routes(max_file_size: u64) -> Router<GatewayService> {
    let upload_limit = usize::try_from(max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route(
            "/api/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/embeddings/generate", post(generate_embedding))
        .route("/api/embeddings/batch", post(generate_batch_embedding))
}

/// CORS policy for `allowed_origins`: `*` allows everything, an explicit
/// list restricts origins, and an empty list yields no layer at all.
pub fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS allows any origin; set ALLOWED_ORIGINS to restrict it");
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, err);
                None
            }
        })
        .collect();
    Some(layer.allow_origin(origins))
}

/// Fully assembled application: routes, shared state, CORS and request tracing.
pub fn app(service: GatewayService, allowed_origins: &[String]) -> Router {
    let router = routes(service.policy().max_file_size)
        .with_state(service)
        .layer(TraceLayer::new_for_http());

    match cors_layer(allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
