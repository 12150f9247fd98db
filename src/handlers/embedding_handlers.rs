//! Embedding pass-through handlers.

use crate::{
    errors::AppError,
    models::embedding::{
        BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingRequest, EmbeddingResponse,
    },
    services::gateway_service::GatewayService,
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

/// `POST /api/embeddings/generate`
pub async fn generate_embedding(
    State(service): State<GatewayService>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, AppError> {
    let Json(req) = payload?;
    let response = service.generate_embedding(req.text, req.input_type).await?;
    Ok(Json(response))
}

/// `POST /api/embeddings/batch`
pub async fn generate_batch_embedding(
    State(service): State<GatewayService>,
    payload: Result<Json<BatchEmbeddingRequest>, JsonRejection>,
) -> Result<Json<BatchEmbeddingResponse>, AppError> {
    let Json(req) = payload?;
    if req.texts.is_empty() {
        return Err(AppError::bad_request("`texts` must contain at least one entry"));
    }
    let response = service
        .generate_batch_embedding(req.texts, req.input_type)
        .await?;
    Ok(Json(response))
}
