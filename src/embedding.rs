//! Embedding client boundary and vector utilities.
//!
//! [`EmbeddingClient`] turns text into a fixed-length vector via an external
//! model provider. The OpenAI implementation calls `POST /v1/embeddings`.
//! No caching and no retry happen at this layer: callers own retry policy,
//! and the retriever deliberately swallows failures into an empty hit list.
//!
//! Vector utilities for SQLite BLOB storage:
//! - [`vec_to_blob`] encodes a `Vec<f32>` as little-endian bytes
//! - [`blob_to_vec`] decodes a BLOB back into a `Vec<f32>`
//! - [`cosine_similarity`] compares two embedding vectors

use async_trait::async_trait;
use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::error::{AdvisorError, Result};

/// External embedding provider boundary.
///
/// Fails with `UpstreamUnavailable` when the provider is unreachable and
/// `InvalidInput` when the text is empty (checked before any network call).
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str, model: Option<&str>) -> Result<Vec<f32>>;

    /// Expected vector dimensionality (e.g. 1536).
    fn dims(&self) -> usize;
}

/// Embedding client for the OpenAI embeddings API.
pub struct OpenAiEmbeddingClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbeddingClient {
    /// Reads `OPENAI_API_KEY` from the environment.
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: config.embedding_model.clone(),
            dims: config.dims,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str, model: Option<&str>) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AdvisorError::InvalidInput(
                "embedding text cannot be empty".to_string(),
            ));
        }

        let model = model.unwrap_or(&self.model);
        let body = serde_json::json!({
            "model": model,
            "input": text,
        });

        let response = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AdvisorError::UpstreamUnavailable(format!(
                "embeddings API returned {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::MalformedResponse(e.to_string()))?;

        parse_embedding_response(&json)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Extract `data[0].embedding` from the provider response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            AdvisorError::MalformedResponse("embeddings response missing data[0].embedding".into())
        })?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
