//! Chunk and search result types for the semantic index.
//!
//! A chunk is one sentence-aligned excerpt of a source document together
//! with its embedding vector. Chunks are created once at ingestion time and
//! shared read-only (`Arc`) with every search result that references them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an embedding vector was produced.
///
/// `Fallback` vectors come from the deterministic text hash used when the
/// embedding collaborator is unavailable; their similarity scores carry
/// lexical, not semantic, meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    Semantic,
    Fallback,
}

/// A stored excerpt of a source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique ID for this chunk
    pub id: String,

    /// The excerpt text
    pub content: String,

    /// Source document identifier (file name, URL, ...)
    pub source: String,

    /// Embedding vector; length is fixed per index instance
    #[serde(skip)]
    pub embedding: Vec<f32>,

    /// Which path produced `embedding`
    pub embedding_mode: EmbeddingMode,

    /// Free-form metadata supplied at ingestion
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A single ranked hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Arc<Chunk>,

    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// The ranked hits of one query plus the mode its query vector was produced in.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub query_mode: EmbeddingMode,
}

impl SearchOutcome {
    pub fn empty(query_mode: EmbeddingMode) -> Self {
        Self {
            results: Vec::new(),
            query_mode,
        }
    }

    /// Distinct sources of the hits, in rank order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for result in &self.results {
            if !seen.contains(&result.chunk.source) {
                seen.push(result.chunk.source.clone());
            }
        }
        seen
    }

    /// True when the query vector or any ranked chunk came from the fallback path.
    pub fn is_degraded(&self) -> bool {
        self.query_mode == EmbeddingMode::Fallback
            || self
                .results
                .iter()
                .any(|r| r.chunk.embedding_mode == EmbeddingMode::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(source: &str, mode: EmbeddingMode) -> SearchResult {
        SearchResult {
            chunk: Arc::new(Chunk {
                id: format!("chunk_{source}"),
                content: "text".into(),
                source: source.into(),
                embedding: vec![1.0, 0.0],
                embedding_mode: mode,
                metadata: serde_json::Map::new(),
            }),
            similarity: 0.5,
        }
    }

    #[test]
    fn sources_are_deduplicated_in_rank_order() {
        let outcome = SearchOutcome {
            results: vec![
                hit("b.md", EmbeddingMode::Semantic),
                hit("a.md", EmbeddingMode::Semantic),
                hit("b.md", EmbeddingMode::Semantic),
            ],
            query_mode: EmbeddingMode::Semantic,
        };
        assert_eq!(outcome.sources(), vec!["b.md", "a.md"]);
        assert!(!outcome.is_degraded());
    }

    #[test]
    fn fallback_chunk_marks_outcome_degraded() {
        let outcome = SearchOutcome {
            results: vec![hit("a.md", EmbeddingMode::Fallback)],
            query_mode: EmbeddingMode::Semantic,
        };
        assert!(outcome.is_degraded());
        assert!(SearchOutcome::empty(EmbeddingMode::Fallback).is_degraded());
    }

    #[test]
    fn embedding_is_not_serialized() {
        let json = serde_json::to_string(&hit("a.md", EmbeddingMode::Semantic).chunk).unwrap();
        assert!(!json.contains("embedding\":["));
        assert!(json.contains("\"semantic\""));
    }

    #[test]
    fn outcome_serializes_shared_chunks_inline() {
        let outcome = SearchOutcome {
            results: vec![hit("a.md", EmbeddingMode::Semantic)],
            query_mode: EmbeddingMode::Fallback,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["results"][0]["chunk"]["source"], "a.md");
        assert_eq!(value["results"][0]["similarity"], 0.5);
        assert_eq!(value["query_mode"], "fallback");
    }
}
