//! Embedding pass-through DTOs.

use serde::{Deserialize, Serialize};

/// How the provider should encode text: documents (`passage`) or search
/// queries (`query`).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Passage,
    Query,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EmbeddingRequest {
    pub text: String,
    #[serde(default)]
    pub input_type: InputType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    pub dimension: usize,
    pub model: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BatchEmbeddingRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub input_type: InputType,
}

/// `count` always equals the number of submitted texts; vectors keep input order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchEmbeddingResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub count: usize,
    pub dimension: usize,
}
