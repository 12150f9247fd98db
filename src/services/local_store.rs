//! src/services/local_store.rs
//!
//! LocalObjectStore: filesystem backend for development without AWS.
//! Objects land at `root/{bucket}/{key}`; the metadata map, content type,
//! size and MD5 etag are written next to the payload as `{key}.meta.json`.

use crate::services::object_store::{ObjectStore, PutObject, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const SIDECAR_SUFFIX: &str = ".meta.json";

/// Sidecar record describing a stored payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredObjectMeta {
    pub key: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    /// Directory holding one subdirectory per bucket.
    pub base_path: PathBuf,
    bucket: String,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            bucket: bucket.into(),
        }
    }

    /// Create the bucket directory if it is missing.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        fs::create_dir_all(self.bucket_root()).await?;
        Ok(())
    }

    /// Reject keys that could escape the bucket directory.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        let invalid = || StorageError::InvalidObjectKey(key.to_string());
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(invalid());
        }
        if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
            return Err(invalid());
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(invalid());
        }
        if key.ends_with(SIDECAR_SUFFIX) {
            return Err(invalid());
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.bucket_root().join(key)
    }

    fn sidecar_path(object_path: &Path) -> PathBuf {
        let mut name = object_path.as_os_str().to_os_string();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }

    /// Read back the sidecar written by `put_object`.
    pub async fn read_meta(&self, key: &str) -> StorageResult<StoredObjectMeta> {
        self.ensure_key_safe(key)?;
        let raw = fs::read(Self::sidecar_path(&self.object_path(key))).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Write `bytes` to a temp file in `parent`, fsync, then rename over `dest`.
    async fn write_atomic(parent: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let result: io::Result<()> = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, dest).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn scheme(&self) -> &'static str {
        "file"
    }

    /// Payload first, sidecar second; a failed sidecar write removes the payload.
    async fn put_object(&self, object: PutObject) -> StorageResult<()> {
        self.ensure_key_safe(&object.key)?;
        self.head_bucket().await?;

        let file_path = self.object_path(&object.key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        Self::write_atomic(&parent, &file_path, &object.body).await?;

        let meta = StoredObjectMeta {
            key: object.key.clone(),
            content_type: object.content_type,
            size_bytes: object.body.len() as u64,
            etag: format!("{:x}", md5::compute(&object.body)),
            last_modified: Utc::now(),
            metadata: object.metadata,
        };
        let sidecar = serde_json::to_vec_pretty(&meta)?;
        if let Err(err) =
            Self::write_atomic(&parent, &Self::sidecar_path(&file_path), &sidecar).await
        {
            let _ = fs::remove_file(&file_path).await;
            return Err(StorageError::Io(err));
        }

        debug!(
            "stored {} ({} bytes, etag {})",
            file_path.display(),
            meta.size_bytes,
            meta.etag
        );
        Ok(())
    }

    async fn head_bucket(&self) -> StorageResult<()> {
        match fs::metadata(self.bucket_root()).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::BucketNotFound(self.bucket.clone())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::BucketNotFound(self.bucket.clone()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}
