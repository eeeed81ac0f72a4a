//! The semantic index: chunks with embedding vectors, searched by cosine
//! similarity.
//!
//! Vectors come from the configured [`Embedder`]. When it is absent or
//! fails, the index substitutes [`fallback_embedding`] and records
//! [`EmbeddingMode::Fallback`] on the chunk or the search outcome. Every
//! vector in one index has the configured dimension; a backend that returns
//! another length is an [`IndexError`], never silently accepted.

use std::sync::Arc;

use ragline_core::chunk::{Chunk, EmbeddingMode, SearchOutcome};
use ragline_core::error::IndexError;
use ragline_core::provider::Embedder;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::fallback::fallback_embedding;
use crate::vector::rank;

/// How many stored chunks were embedded by each path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeCounts {
    pub semantic: usize,
    pub fallback: usize,
}

pub struct SemanticIndex {
    chunks: RwLock<Vec<Arc<Chunk>>>,
    embedder: Option<Arc<dyn Embedder>>,
    dimension: usize,
}

impl SemanticIndex {
    /// Create an index whose vectors all have length `dimension`.
    /// With no embedder every vector is a fallback vector.
    pub fn new(dimension: usize, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            embedder,
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check(&self, vector: Vec<f32>) -> Result<Vec<f32>, IndexError> {
        if vector.is_empty() {
            return Err(IndexError::EmptyEmbedding);
        }
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::NonFiniteEmbedding);
        }
        Ok(vector)
    }

    async fn embed(&self, text: &str) -> Result<(Vec<f32>, EmbeddingMode), IndexError> {
        if let Some(embedder) = &self.embedder {
            match embedder.embed(text).await {
                Ok(vector) => return Ok((self.check(vector)?, EmbeddingMode::Semantic)),
                Err(e) => {
                    warn!(embedder = embedder.name(), error = %e, "Embedding failed, using fallback vector");
                }
            }
        }
        Ok((fallback_embedding(text, self.dimension), EmbeddingMode::Fallback))
    }

    async fn embed_many(
        &self,
        texts: &[String],
    ) -> Result<Vec<(Vec<f32>, EmbeddingMode)>, IndexError> {
        if let Some(embedder) = &self.embedder {
            match embedder.embed_batch(texts).await {
                Ok(vectors) if vectors.len() == texts.len() => {
                    return vectors
                        .into_iter()
                        .map(|v| Ok((self.check(v)?, EmbeddingMode::Semantic)))
                        .collect();
                }
                Ok(vectors) => {
                    warn!(
                        expected = texts.len(),
                        got = vectors.len(),
                        "Batch embedding returned wrong count, using fallback vectors"
                    );
                }
                Err(e) => {
                    warn!(embedder = embedder.name(), error = %e, "Batch embedding failed, using fallback vectors");
                }
            }
        }
        Ok(texts
            .iter()
            .map(|t| (fallback_embedding(t, self.dimension), EmbeddingMode::Fallback))
            .collect())
    }

    fn build_chunk(
        content: String,
        source: &str,
        embedding: Vec<f32>,
        embedding_mode: EmbeddingMode,
        metadata: Map<String, Value>,
    ) -> Arc<Chunk> {
        Arc::new(Chunk {
            id: format!("chunk_{}", Uuid::new_v4()),
            content,
            source: source.to_string(),
            embedding,
            embedding_mode,
            metadata,
        })
    }

    /// Embed and store one chunk.
    pub async fn add_chunk(
        &self,
        content: impl Into<String>,
        source: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Arc<Chunk>, IndexError> {
        let content = content.into();
        let (embedding, mode) = self.embed(&content).await?;
        let chunk = Self::build_chunk(content, source, embedding, mode, metadata.unwrap_or_default());
        self.chunks.write().await.push(Arc::clone(&chunk));
        debug!(source, id = %chunk.id, mode = ?mode, "Chunk indexed");
        Ok(chunk)
    }

    /// Embed all of one document's chunks in a single batch call and store
    /// them in order. Metadata gets `chunk_index` added per chunk.
    pub async fn add_document_chunks(
        &self,
        source: &str,
        contents: Vec<String>,
        metadata: Map<String, Value>,
    ) -> Result<Vec<Arc<Chunk>>, IndexError> {
        if contents.is_empty() {
            return Ok(Vec::new());
        }
        let embedded = self.embed_many(&contents).await?;

        let built: Vec<Arc<Chunk>> = contents
            .into_iter()
            .zip(embedded)
            .enumerate()
            .map(|(i, (content, (embedding, mode)))| {
                let mut meta = metadata.clone();
                meta.insert("chunk_index".into(), Value::from(i));
                Self::build_chunk(content, source, embedding, mode, meta)
            })
            .collect();

        self.chunks.write().await.extend(built.iter().cloned());
        debug!(source, chunks = built.len(), "Document indexed");
        Ok(built)
    }

    /// Return up to `top_k` chunks most similar to `query`.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchOutcome, IndexError> {
        let snapshot: Vec<Arc<Chunk>> = self.chunks.read().await.clone();
        if snapshot.is_empty() {
            let mode = if self.embedder.is_some() {
                EmbeddingMode::Semantic
            } else {
                EmbeddingMode::Fallback
            };
            return Ok(SearchOutcome::empty(mode));
        }

        let (query_vector, query_mode) = self.embed(query).await?;
        let results = rank(&snapshot, &query_vector, top_k)?;
        debug!(hits = results.len(), mode = ?query_mode, "Search complete");
        Ok(SearchOutcome {
            results,
            query_mode,
        })
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    pub async fn mode_counts(&self) -> ModeCounts {
        let chunks = self.chunks.read().await;
        let fallback = chunks
            .iter()
            .filter(|c| c.embedding_mode == EmbeddingMode::Fallback)
            .count();
        ModeCounts {
            semantic: chunks.len() - fallback,
            fallback,
        }
    }

    /// A point-in-time copy of the stored chunks.
    pub async fn chunks(&self) -> Vec<Arc<Chunk>> {
        self.chunks.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragline_core::error::EmbeddingError;

    /// Maps a text to a 3-d vector by keyword presence.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn name(&self) -> &str {
            "keyword"
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let t = text.to_lowercase();
            Ok(vec![
                t.contains("rust") as u8 as f32,
                t.contains("python") as u8 as f32,
                0.1,
            ])
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn name(&self) -> &str {
            "down"
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Network("connection refused".into()))
        }
    }

    struct WrongSizeEmbedder;

    #[async_trait]
    impl Embedder for WrongSizeEmbedder {
        fn name(&self) -> &str {
            "wrong"
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0; 5])
        }
    }

    struct NanEmbedder;

    #[async_trait]
    impl Embedder for NanEmbedder {
        fn name(&self) -> &str {
            "nan"
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![f32::NAN, 1.0, 0.0])
        }
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let index = SemanticIndex::new(3, Some(Arc::new(KeywordEmbedder)));
        let outcome = index.search("rust", 3).await.unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.query_mode, EmbeddingMode::Semantic);
    }

    #[tokio::test]
    async fn search_ranks_and_limits() {
        let index = SemanticIndex::new(3, Some(Arc::new(KeywordEmbedder)));
        index.add_chunk("Python is dynamic", "py.md", None).await.unwrap();
        index.add_chunk("Rust is fast", "rust.md", None).await.unwrap();
        index.add_chunk("Cooking pasta", "food.md", None).await.unwrap();

        let outcome = index.search("tell me about rust", 2).await.unwrap();
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].chunk.source, "rust.md");
        assert!(outcome.results[0].similarity >= outcome.results[1].similarity);

        let all = index.search("rust", 10).await.unwrap();
        assert_eq!(all.results.len(), 3);
    }

    #[tokio::test]
    async fn failing_embedder_degrades_to_fallback() {
        let index = SemanticIndex::new(16, Some(Arc::new(DownEmbedder)));
        let chunk = index.add_chunk("ownership and borrowing", "a.md", None).await.unwrap();
        assert_eq!(chunk.embedding_mode, EmbeddingMode::Fallback);
        assert_eq!(chunk.embedding.len(), 16);

        let outcome = index.search("borrowing", 1).await.unwrap();
        assert_eq!(outcome.query_mode, EmbeddingMode::Fallback);
        assert!(outcome.is_degraded());
        assert_eq!(index.mode_counts().await, ModeCounts { semantic: 0, fallback: 1 });
    }

    #[tokio::test]
    async fn no_embedder_uses_fallback() {
        let index = SemanticIndex::new(32, None);
        index.add_chunk("alpha beta", "a.md", None).await.unwrap();
        index.add_chunk("gamma delta", "b.md", None).await.unwrap();
        let outcome = index.search("gamma", 1).await.unwrap();
        assert_eq!(outcome.results[0].chunk.source, "b.md");
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let index = SemanticIndex::new(3, Some(Arc::new(WrongSizeEmbedder)));
        let err = index.add_chunk("text", "a.md", None).await.unwrap_err();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 3, actual: 5 });
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn non_finite_embedding_is_rejected() {
        let index = SemanticIndex::new(3, Some(Arc::new(NanEmbedder)));
        let err = index.add_chunk("text", "a.md", None).await.unwrap_err();
        assert_eq!(err, IndexError::NonFiniteEmbedding);
        let err = index
            .add_document_chunks("a.md", vec!["one".into(), "two".into()], Map::new())
            .await
            .unwrap_err();
        assert_eq!(err, IndexError::NonFiniteEmbedding);
        assert!(index.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_and_readers() {
        let index = Arc::new(SemanticIndex::new(3, Some(Arc::new(KeywordEmbedder))));
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let index = Arc::clone(&index);
            tasks.spawn(async move {
                let text = if i % 2 == 0 { "Rust notes" } else { "Python notes" };
                index.add_chunk(text, &format!("doc{i}.md"), None).await.unwrap();
                let outcome = index.search("rust", 5).await.unwrap();
                assert!(!outcome.results.is_empty());
                assert!(outcome.results.len() <= 5);
                assert!(outcome
                    .results
                    .windows(2)
                    .all(|w| w[0].similarity >= w[1].similarity));
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert_eq!(index.len().await, 32);
        let mut sources: Vec<_> = index.chunks().await.iter().map(|c| c.source.clone()).collect();
        sources.sort();
        sources.dedup();
        assert_eq!(sources.len(), 32);
        assert_eq!(index.mode_counts().await, ModeCounts { semantic: 32, fallback: 0 });
    }

    #[tokio::test]
    async fn document_chunks_are_batched_with_index_metadata() {
        let index = SemanticIndex::new(3, Some(Arc::new(KeywordEmbedder)));
        let mut meta = Map::new();
        meta.insert("path".into(), Value::from("docs/a.md"));
        let chunks = index
            .add_document_chunks(
                "a.md",
                vec!["Rust one.".into(), "Python two.".into()],
                meta,
            )
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].metadata["chunk_index"], 1);
        assert_eq!(chunks[1].metadata["path"], "docs/a.md");
        assert_ne!(chunks[0].id, chunks[1].id);
        assert_eq!(index.len().await, 2);
        assert_eq!(index.mode_counts().await.semantic, 2);
    }
}
