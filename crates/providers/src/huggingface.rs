//! HuggingFace inference API embedding backend.
//!
//! The endpoint answers either with a bare array or with an object carrying
//! an `embeddings` array. For a single input the array may be the vector
//! itself or a one-element list of vectors.

use async_trait::async_trait;
use ragline_core::error::EmbeddingError;
use ragline_core::provider::Embedder;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

pub struct HuggingFaceEmbedder {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HuggingFaceEmbedder {
    /// Build an embedder for `model`. The key is optional; anonymous
    /// requests are rate limited harder but work.
    pub fn new(
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Network(format!("HTTP client: {e}")))?;

        Ok(Self {
            url: format!("{DEFAULT_BASE_URL}/{model}"),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Point at a full endpoint URL instead of the hosted inference API.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn post(&self, inputs: Value) -> Result<Value, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "inputs": inputs }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiError {
                status_code: status,
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(len = text.len(), "Embedding single text");
        let body = self.post(Value::String(text.to_string())).await?;
        parse_single(&body)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), "Embedding batch");
        let body = self.post(serde_json::json!(texts)).await?;
        let vectors = parse_batch(&body)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

fn payload(body: &Value) -> Result<&Vec<Value>, EmbeddingError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match map.get("embeddings") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(EmbeddingError::MalformedResponse(
                "object without an embeddings array".into(),
            )),
        },
        other => Err(EmbeddingError::MalformedResponse(format!(
            "expected array, got {other}"
        ))),
    }
}

fn to_vector(items: &[Value]) -> Result<Vec<f32>, EmbeddingError> {
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::MalformedResponse(format!("non-numeric value {v}")))
        })
        .collect()
}

fn parse_single(body: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let items = payload(body)?;
    match items.first() {
        None => Err(EmbeddingError::MalformedResponse("empty embedding".into())),
        Some(Value::Array(inner)) => to_vector(inner),
        Some(_) => to_vector(items),
    }
}

fn parse_batch(body: &Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    payload(body)?
        .iter()
        .map(|row| match row {
            Value::Array(inner) => to_vector(inner),
            other => Err(EmbeddingError::MalformedResponse(format!(
                "expected vector, got {other}"
            ))),
        })
        .collect()
}
