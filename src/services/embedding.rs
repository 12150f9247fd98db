//! Embedding provider abstraction and the NVIDIA HTTP client.
//!
//! Both deployment flavours speak the OpenAI-compatible `/embeddings`
//! protocol extended with NVIDIA's `input_type` field:
//!
//! - **development**: hosted NVIDIA API, authenticated with a bearer key,
//!   liveness checked with `GET /models`.
//! - **production**: self-hosted NIM container, unauthenticated, liveness
//!   checked with `GET /health/ready`.
//!
//! The flavour is picked once at startup by [`select_embedding_provider`].

use crate::config::{EmbeddingConfig, Environment};
use crate::models::embedding::InputType;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info, warn};

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    #[error("failed to build embedding client: {0}")]
    Client(String),
}

/// Vectors returned for one provider call, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    pub vectors: Vec<Vec<f32>>,
    pub model: String,
}

impl Embeddings {
    /// Length shared by every vector; `None` when the set is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `texts` in order. Implementations return exactly one vector per
    /// input and all vectors share one length.
    async fn embed(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Embeddings, EmbeddingError>;

    /// Read-only liveness probe.
    async fn health_check(&self) -> Result<(), EmbeddingError>;

    fn model_name(&self) -> &str;

    /// Human-readable backend label, e.g. `NIM (Production)`.
    fn describe(&self) -> &str;
}

/// Which NVIDIA deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NimFlavor {
    HostedApi,
    SelfHosted,
}

impl NimFlavor {
    fn health_path(self) -> &'static str {
        match self {
            NimFlavor::HostedApi => "/models",
            NimFlavor::SelfHosted => "/health/ready",
        }
    }

    fn label(self) -> &'static str {
        match self {
            NimFlavor::HostedApi => "NVIDIA API (Development)",
            NimFlavor::SelfHosted => "NIM (Production)",
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    input_type: InputType,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { message: String },
    Text(String),
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        match (self.detail, self.error) {
            (Some(detail), _) => Some(detail),
            (None, Some(ErrorDetail::Message { message })) => Some(message),
            (None, Some(ErrorDetail::Text(text))) => Some(text),
            (None, None) => None,
        }
    }
}

/// HTTP client for NVIDIA-hosted and self-hosted NIM embedding endpoints.
pub struct NimEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    flavor: NimFlavor,
}

impl NimEmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
        flavor: NimFlavor,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Client(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!(
            "Initializing embedding client: backend={}, url={}, model={}",
            flavor.label(),
            base_url,
            model
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
            flavor,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for NimEmbeddingClient {
    async fn embed(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Embeddings, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Embeddings {
                vectors: Vec::new(),
                model: self.model.clone(),
            });
        }

        debug!(
            "Embedding {} texts with model {} ({:?})",
            texts.len(),
            self.model,
            input_type
        );

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            input_type,
            encoding_format: "float",
        };

        let response = self
            .authorize(self.client.post(self.url("/embeddings")))
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.without_url().to_string()))?;

        let mut data = body.data;
        data.sort_by_key(|d| d.index);
        let embeddings = Embeddings {
            vectors: data.into_iter().map(|d| d.embedding).collect(),
            model: body.model.unwrap_or_else(|| self.model.clone()),
        };
        check_shape(&embeddings, texts.len())?;

        debug!("Generated {} embeddings", embeddings.vectors.len());
        Ok(embeddings)
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        let response = self
            .authorize(self.client.get(self.url(self.flavor.health_path())))
            .timeout(HEALTH_PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                warn!("Embedding health check error: {}", e);
                EmbeddingError::Request(e.without_url().to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!("Embedding health check failed: {}", status);
            Err(EmbeddingError::Status {
                status: status.as_u16(),
                message: format!("health probe {} failed", self.flavor.health_path()),
            })
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn describe(&self) -> &str {
        self.flavor.label()
    }
}

/// One vector per input, all of the same non-zero length.
pub fn check_shape(embeddings: &Embeddings, expected: usize) -> Result<(), EmbeddingError> {
    if embeddings.vectors.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.vectors.len()
        )));
    }
    if let Some(dimension) = embeddings.dimension() {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidResponse(
                "provider returned an empty vector".into(),
            ));
        }
        if let Some(pos) = embeddings.vectors.iter().position(|v| v.len() != dimension) {
            return Err(EmbeddingError::InvalidResponse(format!(
                "embedding {} has dimension {}, expected {}",
                pos,
                embeddings.vectors[pos].len(),
                dimension
            )));
        }
    }
    Ok(())
}

/// Choose the embedding backend for `environment`. Called once at startup.
pub fn select_embedding_provider(
    environment: Environment,
    cfg: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let client = match environment {
        Environment::Production => NimEmbeddingClient::new(
            cfg.nim_endpoint.clone(),
            None,
            cfg.model.clone(),
            timeout,
            NimFlavor::SelfHosted,
        )?,
        Environment::Development => {
            if cfg.api_key.is_none() {
                warn!("NVIDIA_API_KEY is not set; hosted embedding calls will be rejected");
            }
            NimEmbeddingClient::new(
                cfg.api_url.clone(),
                cfg.api_key.clone(),
                cfg.model.clone(),
                timeout,
                NimFlavor::HostedApi,
            )?
        }
    };
    Ok(Arc::new(client))
}
