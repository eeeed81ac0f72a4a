//! The Ragline agent: context assembly and per-message orchestration.
//!
//! For each incoming message the orchestrator:
//!
//! 1. **Records** the message in the session
//! 2. **Retrieves** relevant excerpts from the semantic index
//! 3. **Routes** the query to at most one tool and runs it (concurrently with retrieval)
//! 4. **Assembles** one prompt from instructions, excerpts, tool output and history
//! 5. **Generates** a reply and records it
//!
//! Collaborators are injected as `Arc`s, so the gateway, the CLI and tests
//! all share the same state objects.

pub mod context;
pub mod orchestrator;

#[cfg(test)]
mod test_helpers;

pub use context::{AssembledPrompt, AssemblyInput, AssemblyMetadata, ContextAssembler, ToolOutput};
pub use orchestrator::{AgentRequest, AgentResponse, Orchestrator, OrchestratorSettings};
