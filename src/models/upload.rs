//! Upload request and result types.

use bytes::Bytes;
use serde::Serialize;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A fully buffered file received from a client.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// What the gateway reports back after a successful write.
///
/// Field names are part of the public JSON contract (`s3_key` and `file_url`
/// keep their names for every backend).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub original_filename: String,
    pub s3_key: String,
    /// `scheme://bucket/key`
    pub file_url: String,
    pub file_size: u64,
    /// Lowercase text after the last `.`.
    pub file_extension: String,
    /// `YYYYMMDD_HHMMSS`, the same value embedded in the key.
    pub upload_time: String,
}

/// `POST /api/upload` success envelope.
#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub data: UploadResult,
}

impl UploadResponse {
    pub fn uploaded(data: UploadResult) -> Self {
        Self {
            success: true,
            message: "File uploaded successfully".into(),
            data,
        }
    }
}
