//! Collaborator traits: text generation and text embedding.
//!
//! A `Provider` turns one prompt string into one reply string. An `Embedder`
//! maps text to a fixed-length vector. Both are black boxes to the core;
//! implementations live in `ragline-providers`.
//!
//! Implementations: Gemini, OpenAI-compatible, HuggingFace inference.

use async_trait::async_trait;
use crate::error::{EmbeddingError, ProviderError};

/// The generation collaborator.
///
/// Single-shot, no streaming. Errors are typed; an empty reply is a
/// successful `Ok(String::new())`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a prompt and get the complete reply text.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}

/// The embedding collaborator.
///
/// Output length must be constant per deployment.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this embedder.
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts, one vector per input in input order.
    ///
    /// Default implementation calls `embed()` sequentially.
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
