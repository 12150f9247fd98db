#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use memory_hub::{
    config::Environment,
    models::embedding::InputType,
    routes::routes::app,
    services::{
        embedding::{EmbeddingError, EmbeddingProvider, Embeddings},
        gateway_service::GatewayService,
        object_store::{ObjectStore, PutObject, StorageError, StorageResult},
        validation::UploadPolicy,
    },
};
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

pub const BOUNDARY: &str = "memoryhubboundary";

/// Object store fake that counts calls and keeps every write.
#[derive(Default)]
pub struct FakeStore {
    pub puts: Mutex<Vec<PutObject>>,
    pub head_calls: AtomicUsize,
    pub fail: bool,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    fn scheme(&self) -> &'static str {
        "s3"
    }

    async fn put_object(&self, object: PutObject) -> StorageResult<()> {
        self.puts.lock().unwrap().push(object);
        if self.fail {
            return Err(StorageError::Backend("service unavailable".into()));
        }
        Ok(())
    }

    async fn head_bucket(&self) -> StorageResult<()> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::BucketNotFound("test-bucket".into()));
        }
        Ok(())
    }
}

/// Embedding fake producing `dimension`-long vectors whose first component
/// is the input's position.
pub struct FakeEmbedder {
    pub dimension: usize,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(4)
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        _input_type: InputType,
    ) -> Result<Embeddings, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbeddingError::Status {
                status: 503,
                message: "model loading".into(),
            });
        }
        Ok(Embeddings {
            vectors: (0..texts.len())
                .map(|i| {
                    let mut v = vec![0.5; self.dimension];
                    v[0] = i as f32;
                    v
                })
                .collect(),
            model: "fake-embed".into(),
        })
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Request("connection refused".into()));
        }
        Ok(())
    }

    fn model_name(&self) -> &str {
        "fake-embed"
    }

    fn describe(&self) -> &str {
        "fake"
    }
}

pub fn router_with(store: Arc<FakeStore>, embedder: Arc<FakeEmbedder>) -> Router {
    router_with_policy(store, embedder, UploadPolicy::default())
}

pub fn router_with_policy(
    store: Arc<FakeStore>,
    embedder: Arc<FakeEmbedder>,
    policy: UploadPolicy,
) -> Router {
    let service = GatewayService::new(store, embedder, policy, Environment::Development);
    app(service, &["*".to_string()])
}

/// Single-part `multipart/form-data` body.
pub fn multipart_body(field: &str, filename: Option<&str>, content_type: &str, data: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builder should not fail")
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builder should not fail")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builder should not fail")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body must be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response must be valid JSON")
}
