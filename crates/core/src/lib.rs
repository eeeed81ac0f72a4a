//! # Ragline Core
//!
//! Domain types, traits, and error definitions for the Ragline
//! retrieval-augmented agent. This crate has **zero framework dependencies**:
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping generation/embedding backends via configuration
//! - Easy testing with stub collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod chunk;
pub mod error;
pub mod intent;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use chunk::{Chunk, EmbeddingMode, SearchOutcome, SearchResult};
pub use error::{Error, Result};
pub use intent::{IntentMatch, IntentRule};
pub use message::{Message, Role, Session, SessionId};
pub use provider::{Embedder, Provider};
pub use tool::{Tool, ToolRegistry, ToolResult};
