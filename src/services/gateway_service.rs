//! src/services/gateway_service.rs
//!
//! GatewayService: coordinates uploads, embedding pass-through and health
//! aggregation. Holds the object store and embedding provider chosen at
//! startup; carries no mutable state, so clones are shared freely across
//! request handlers.

use crate::{
    config::Environment,
    models::{
        embedding::{BatchEmbeddingResponse, EmbeddingResponse, InputType},
        health::{AggregatedHealth, DependencyHealth, ServiceHealth},
        upload::{DEFAULT_CONTENT_TYPE, UploadRequest, UploadResult},
    },
    services::{
        embedding::{EmbeddingError, EmbeddingProvider, check_shape},
        object_store::{ObjectStore, PutObject, StorageError},
        validation::{UploadPolicy, ValidationError},
    },
};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{error, info, warn};

const KEY_PREFIX: &str = "uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Upload failed: {0}")]
    StorageWriteFailed(#[source] StorageError),
}

#[derive(Clone)]
pub struct GatewayService {
    store: Arc<dyn ObjectStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    policy: Arc<UploadPolicy>,
    environment: Environment,
}

impl GatewayService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        policy: UploadPolicy,
        environment: Environment,
    ) -> Self {
        Self {
            store,
            embedder,
            policy: Arc::new(policy),
            environment,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    /// Validate and store one file, stamping it with the current time.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResult, UploadError> {
        self.upload_at(request, Utc::now()).await
    }

    /// Same as [`upload`](Self::upload) with an explicit processing time.
    ///
    /// Performs exactly one storage write on success and none when
    /// validation fails.
    pub async fn upload_at(
        &self,
        request: UploadRequest,
        now: DateTime<Utc>,
    ) -> Result<UploadResult, UploadError> {
        let file_size = request.data.len() as u64;
        let file_extension = self
            .policy
            .validate(request.filename.as_deref(), file_size)?;
        // validate() rejects a missing name
        let original_filename = request.filename.unwrap_or_default();

        let timestamp = upload_timestamp(now);
        let key = storage_key(&timestamp, &original_filename);
        let content_type = request
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        info!(
            "Uploading {} ({} bytes, {}) as {}",
            original_filename, file_size, content_type, key
        );

        let object = PutObject {
            key: key.clone(),
            body: request.data,
            content_type,
            metadata: HashMap::from([
                ("original_filename".to_string(), original_filename.clone()),
                ("upload_timestamp".to_string(), timestamp.clone()),
            ]),
        };

        if let Err(err) = self.store.put_object(object).await {
            error!("Upload of {} failed: {}", key, err);
            return Err(UploadError::StorageWriteFailed(err));
        }

        info!("Upload successful: {}", key);
        Ok(UploadResult {
            original_filename,
            file_url: self.store.object_uri(&key),
            s3_key: key,
            file_size,
            file_extension,
            upload_time: timestamp,
        })
    }

    /// Probe both dependencies concurrently. Never fails: probe errors
    /// become `unhealthy` entries.
    pub async fn check_health(&self) -> AggregatedHealth {
        let (s3, embedding) = tokio::join!(self.probe_store(), self.probe_embedder());
        let report = AggregatedHealth::from_services(
            self.environment.as_str(),
            ServiceHealth { s3, embedding },
        );
        if !report.services.s3.is_healthy() || !report.services.embedding.is_healthy() {
            warn!("Health check degraded: {:?}", report.services);
        }
        report
    }

    async fn probe_store(&self) -> DependencyHealth {
        let target = format!("{}://{}", self.store.scheme(), self.store.bucket());
        // a panicking backend must not take the health endpoint down with it
        let store = self.store.clone();
        match tokio::spawn(async move { store.head_bucket().await }).await {
            Ok(Ok(())) => DependencyHealth::healthy(target),
            Ok(Err(err)) => DependencyHealth::unhealthy(target, err.to_string()),
            Err(join_err) => {
                DependencyHealth::unhealthy(target, format!("probe aborted: {}", join_err))
            }
        }
    }

    async fn probe_embedder(&self) -> DependencyHealth {
        let target = format!(
            "{} ({})",
            self.embedder.describe(),
            self.embedder.model_name()
        );
        let embedder = self.embedder.clone();
        match tokio::spawn(async move { embedder.health_check().await }).await {
            Ok(Ok(())) => DependencyHealth::healthy(target),
            Ok(Err(err)) => DependencyHealth::unhealthy(target, err.to_string()),
            Err(join_err) => {
                DependencyHealth::unhealthy(target, format!("probe aborted: {}", join_err))
            }
        }
    }

    /// Embed a single text.
    pub async fn generate_embedding(
        &self,
        text: String,
        input_type: InputType,
    ) -> Result<EmbeddingResponse, EmbeddingError> {
        let texts = [text];
        let result = self
            .embedder
            .embed(&texts, input_type)
            .await
            .and_then(|embeddings| check_shape(&embeddings, 1).map(|_| embeddings))
            .inspect_err(|err| error!("Embedding generation failed: {}", err))?;

        let model = result.model;
        let embedding = result.vectors.into_iter().next().unwrap_or_default();
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model,
        })
    }

    /// Embed `texts` in one provider call; output order matches input order.
    pub async fn generate_batch_embedding(
        &self,
        texts: Vec<String>,
        input_type: InputType,
    ) -> Result<BatchEmbeddingResponse, EmbeddingError> {
        let result = self
            .embedder
            .embed(&texts, input_type)
            .await
            .and_then(|embeddings| check_shape(&embeddings, texts.len()).map(|_| embeddings))
            .inspect_err(|err| error!("Batch embedding failed: {}", err))?;

        Ok(BatchEmbeddingResponse {
            dimension: result.dimension().unwrap_or(0),
            count: result.vectors.len(),
            embeddings: result.vectors,
        })
    }
}

/// `YYYYMMDD_HHMMSS`
pub fn upload_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// `uploads/{timestamp}_{filename}`. Two uploads of the same name within
/// one second share a key; the later write wins.
pub fn storage_key(timestamp: &str, filename: &str) -> String {
    format!("{}/{}_{}", KEY_PREFIX, timestamp, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding::Embeddings;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<PutObject>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        fn bucket(&self) -> &str {
            "hub"
        }

        fn scheme(&self) -> &'static str {
            "s3"
        }

        async fn put_object(&self, object: PutObject) -> Result<(), StorageError> {
            self.puts.lock().unwrap().push(object);
            match &self.fail_with {
                Some(msg) => Err(StorageError::Backend(msg.clone())),
                None => Ok(()),
            }
        }

        async fn head_bucket(&self) -> Result<(), StorageError> {
            match &self.fail_with {
                Some(msg) => Err(StorageError::Backend(msg.clone())),
                None => Ok(()),
            }
        }
    }

    /// Returns `[len, 1.0, 2.0]` per text, or a ragged set when asked.
    struct StubEmbedder {
        ragged: bool,
        panic_on_probe: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(
            &self,
            texts: &[String],
            _input_type: InputType,
        ) -> Result<Embeddings, EmbeddingError> {
            let mut vectors: Vec<Vec<f32>> = texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0, 2.0])
                .collect();
            if self.ragged {
                if let Some(last) = vectors.last_mut() {
                    last.pop();
                }
            }
            Ok(Embeddings {
                vectors,
                model: "stub-model".into(),
            })
        }

        async fn health_check(&self) -> Result<(), EmbeddingError> {
            if self.panic_on_probe {
                panic!("probe exploded");
            }
            Ok(())
        }

        fn model_name(&self) -> &str {
            "stub-model"
        }

        fn describe(&self) -> &str {
            "stub"
        }
    }

    fn service(store: Arc<RecordingStore>, embedder: StubEmbedder) -> GatewayService {
        GatewayService::new(
            store,
            Arc::new(embedder),
            UploadPolicy::default(),
            Environment::Development,
        )
    }

    fn stub() -> StubEmbedder {
        StubEmbedder {
            ragged: false,
            panic_on_probe: false,
        }
    }

    fn request(name: Option<&str>, data: &'static [u8], ct: Option<&str>) -> UploadRequest {
        UploadRequest {
            filename: name.map(str::to_string),
            content_type: ct.map(str::to_string),
            data: Bytes::from_static(data),
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn key_uses_timestamp_and_original_name() {
        let ts = upload_timestamp(fixed_time());
        assert_eq!(ts, "20240102_030405");
        assert_eq!(storage_key(&ts, "notes.md"), "uploads/20240102_030405_notes.md");
    }

    #[tokio::test]
    async fn upload_writes_once_with_metadata() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(store.clone(), stub());

        let result = svc
            .upload_at(request(Some("notes.md"), b"# hello", Some("text/markdown")), fixed_time())
            .await
            .unwrap();

        assert_eq!(
            result,
            UploadResult {
                original_filename: "notes.md".into(),
                s3_key: "uploads/20240102_030405_notes.md".into(),
                file_url: "s3://hub/uploads/20240102_030405_notes.md".into(),
                file_size: 7,
                file_extension: "md".into(),
                upload_time: "20240102_030405".into(),
            }
        );

        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].key, "uploads/20240102_030405_notes.md");
        assert_eq!(puts[0].content_type, "text/markdown");
        assert_eq!(puts[0].body.as_ref(), b"# hello");
        assert_eq!(puts[0].metadata["original_filename"], "notes.md");
        assert_eq!(puts[0].metadata["upload_timestamp"], "20240102_030405");
    }

    #[tokio::test]
    async fn missing_content_type_defaults_to_octet_stream() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(store.clone(), stub());
        svc.upload(request(Some("a.PNG"), b"\x89PNG", None)).await.unwrap();
        let puts = store.puts.lock().unwrap();
        assert_eq!(puts[0].content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn invalid_uploads_never_reach_storage() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(store.clone(), stub());

        for name in [None, Some(""), Some("README"), Some("a.exe")] {
            let err = svc.upload(request(name, b"data", None)).await.unwrap_err();
            assert!(matches!(err, UploadError::Invalid(_)), "{name:?}: {err:?}");
        }
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_reported_with_cause() {
        let store = Arc::new(RecordingStore {
            fail_with: Some("AccessDenied".into()),
            ..Default::default()
        });
        let svc = service(store.clone(), stub());

        let err = svc.upload(request(Some("a.txt"), b"x", None)).await.unwrap_err();
        assert!(matches!(err, UploadError::StorageWriteFailed(_)));
        assert_eq!(err.to_string(), "Upload failed: AccessDenied");
        assert_eq!(store.puts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_survives_failing_and_panicking_probes() {
        let store = Arc::new(RecordingStore {
            fail_with: Some("bucket unreachable".into()),
            ..Default::default()
        });
        let svc = service(
            store,
            StubEmbedder {
                ragged: false,
                panic_on_probe: true,
            },
        );

        let report = svc.check_health().await;
        assert!(!report.services.s3.is_healthy());
        assert_eq!(
            report.services.s3.error.as_deref(),
            Some("bucket unreachable")
        );
        assert!(!report.services.embedding.is_healthy());
        assert!(!report.services.embedding.error.clone().unwrap().is_empty());
        assert_eq!(report.status, crate::models::health::HealthState::Unhealthy);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_count() {
        let svc = service(Arc::new(RecordingStore::default()), stub());
        let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let resp = svc
            .generate_batch_embedding(texts, InputType::Passage)
            .await
            .unwrap();
        assert_eq!(resp.count, 3);
        assert_eq!(resp.dimension, 3);
        assert!(resp.embeddings.iter().all(|v| v.len() == resp.dimension));
        let firsts: Vec<f32> = resp.embeddings.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn ragged_provider_output_is_an_error() {
        let svc = service(
            Arc::new(RecordingStore::default()),
            StubEmbedder {
                ragged: true,
                panic_on_probe: false,
            },
        );
        let err = svc
            .generate_batch_embedding(vec!["a".into(), "b".into()], InputType::Query)
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn single_embedding_reports_dimension_and_model() {
        let svc = service(Arc::new(RecordingStore::default()), stub());
        let resp = svc
            .generate_embedding("hello".into(), InputType::Query)
            .await
            .unwrap();
        assert_eq!(resp.embedding, vec![5.0, 1.0, 2.0]);
        assert_eq!(resp.dimension, 3);
        assert_eq!(resp.model, "stub-model");
    }
}
