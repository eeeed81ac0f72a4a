//! Error types for the Ragline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Ragline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Embedding errors ---
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    // --- Index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the generation collaborator.
///
/// A successful-but-empty reply is `Ok(String::new())`, never one of these.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Failures of the embedding collaborator. The semantic index absorbs
/// these by switching to fallback vectors.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected embedding response format: {0}")]
    MalformedResponse(String),

    #[error("Embedder returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Invariant violations inside the semantic index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding vector is empty")]
    EmptyEmbedding,

    #[error("Embedding vector holds NaN or infinite components")]
    NonFiniteEmbedding,
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Invalid intent rule for '{tool_name}': {reason}")]
    InvalidRule { tool_name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Corpus directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to index {source_name}: {reason}")]
    Index { source_name: String, reason: String },
}

/// Errors surfaced by the orchestrator to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// Input error: rejected before any state is touched.
    #[error("Message is required")]
    EmptyMessage,

    /// Any pipeline failure after the message was accepted.
    #[error("Failed to process message")]
    ProcessingFailed,
}
