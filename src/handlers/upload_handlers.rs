//! HTTP handler for file uploads.
//! Reads the multipart `file` field with a running size check so an
//! oversized body is rejected as soon as it crosses the ceiling, then hands
//! the buffered bytes to `GatewayService`.

use crate::{
    errors::AppError,
    models::upload::{UploadRequest, UploadResponse},
    services::{gateway_service::GatewayService, validation::ValidationError},
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::BytesMut;
use tracing::{debug, warn};

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// `POST /api/upload`
pub async fn upload_file(
    State(service): State<GatewayService>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let policy = service.policy();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            debug!("skipping multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        // name and extension are known before the body; fail before reading it
        policy.validate_name(filename.as_deref())?;

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            let size = (buf.len() + chunk.len()) as u64;
            if size > policy.max_file_size {
                warn!(
                    "aborting upload of {:?}: {} bytes read, limit {}",
                    filename, size, policy.max_file_size
                );
                return Err(ValidationError::FileTooLarge {
                    size,
                    limit: policy.max_file_size,
                }
                .into());
            }
            buf.extend_from_slice(&chunk);
        }

        let result = service
            .upload(UploadRequest {
                filename,
                content_type,
                data: buf.freeze(),
            })
            .await?;
        return Ok(Json(UploadResponse::uploaded(result)));
    }

    Err(AppError::bad_request(format!(
        "No file provided: expected a multipart field named `{}`",
        FILE_FIELD
    )))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::bad_request(format!("File too large: {}", err.body_text()))
    } else {
        AppError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}
