//! Object storage abstraction used by the gateway.
//!
//! The gateway only ever needs two calls against a blob store: write one
//! object (bytes + content type + metadata map) and check that the configured
//! bucket is reachable. Backends live in `s3_store` and `local_store`.

use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::HashMap, io};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    /// Error text reported by a remote backend (already rendered without credentials).
    #[error("{0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A single object write.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    /// User metadata stored alongside the object (`x-amz-meta-*` on S3).
    pub metadata: HashMap<String, String>,
}

/// Bucket-scoped blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket every call is scoped to.
    fn bucket(&self) -> &str;

    /// URI scheme used when reporting object locations (`s3`, `file`).
    fn scheme(&self) -> &'static str;

    /// Write one object. Overwrites an existing object with the same key.
    async fn put_object(&self, object: PutObject) -> StorageResult<()>;

    /// Read-only existence check for the configured bucket.
    async fn head_bucket(&self) -> StorageResult<()>;

    /// `scheme://bucket/key`
    fn object_uri(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme(), self.bucket(), key)
    }
}
