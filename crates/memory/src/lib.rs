//! Retrieval and conversation state for Ragline.
//!
//! - [`segmenter`]: sentence-aligned chunking
//! - [`vector`]: cosine similarity and ranking
//! - [`fallback`]: deterministic embeddings for when the backend is down
//! - [`index`]: the semantic index
//! - [`session`]: per-session message logs
//! - [`ingest`]: directory ingestion

pub mod fallback;
pub mod index;
pub mod ingest;
pub mod segmenter;
pub mod session;
pub mod vector;

pub use fallback::fallback_embedding;
pub use index::{ModeCounts, SemanticIndex};
pub use ingest::{DocumentIngestor, IngestOptions, IngestReport};
pub use segmenter::{Segment, segment, segments};
pub use session::SessionStore;
pub use vector::{cosine_similarity, rank};
