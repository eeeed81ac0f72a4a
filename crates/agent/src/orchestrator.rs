//! The message orchestrator: one linear pipeline per incoming message.
//!
//! 1. Reject a blank message
//! 2. Open a turn on the session, recording the message as sent
//! 3. Read the recent history window
//! 4. Search the index and, when an intent clears the threshold, run the
//!    tool; both concurrently
//! 5. Assemble the prompt and generate a reply
//! 6. Close the turn with the reply and return the response envelope
//!
//! Any failure after step 1 is logged with its cause and surfaced as the
//! generic [`AgentError::ProcessingFailed`]. Nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ragline_config::AppConfig;
use ragline_core::chunk::EmbeddingMode;
use ragline_core::error::AgentError;
use ragline_core::message::{Message, SessionId};
use ragline_core::provider::Provider;
use ragline_core::tool::ToolRegistry;
use ragline_memory::{SemanticIndex, SessionStore};
use ragline_tools::IntentRouter;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::{AssemblyInput, ContextAssembler, ToolOutput};

/// An incoming message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    #[serde(default)]
    pub message: String,

    /// Generated when absent.
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl AgentRequest {
    pub fn new(message: impl Into<String>, session_id: Option<SessionId>) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }
}

/// The response envelope for one processed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub reply: String,
    pub session_id: SessionId,
    /// Distinct sources of the retrieved excerpts, in rank order.
    pub context_used: Vec<String>,
    /// Tools that were run for this message, successful or not.
    pub plugins_used: Vec<String>,
    /// How the query vector was produced.
    pub retrieval_mode: EmbeddingMode,
    pub timestamp: DateTime<Utc>,
}

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub top_k: usize,
    pub history_window: usize,
    /// A tool runs only when the intent confidence is strictly greater.
    pub confidence_threshold: f32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            history_window: 2,
            confidence_threshold: 0.7,
        }
    }
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            history_window: config.retrieval.history_window,
            confidence_threshold: config.intent.confidence_threshold,
        }
    }
}

pub struct Orchestrator {
    index: Arc<SemanticIndex>,
    sessions: Arc<SessionStore>,
    tools: Arc<ToolRegistry>,
    router: IntentRouter,
    generator: Arc<dyn Provider>,
    assembler: ContextAssembler,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        index: Arc<SemanticIndex>,
        sessions: Arc<SessionStore>,
        tools: Arc<ToolRegistry>,
        router: IntentRouter,
        generator: Arc<dyn Provider>,
        settings: OrchestratorSettings,
    ) -> Self {
        let assembler = ContextAssembler::new(
            tools
                .names()
                .into_iter()
                .filter_map(|name| tools.get(name).map(|t| (name, t.description()))),
        );
        Self {
            index,
            sessions,
            tools,
            router,
            generator,
            assembler,
            settings,
        }
    }

    pub fn index(&self) -> &Arc<SemanticIndex> {
        &self.index
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Process one message end to end.
    pub async fn process(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        if request.message.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        let session_id = request.session_id.unwrap_or_default();
        let message = request.message.as_str();

        self.sessions
            .begin_turn(&session_id, Message::user(message))
            .await;
        let result = self.run(&session_id, message).await;
        let reply = result
            .as_ref()
            .ok()
            .map(|r| Message::assistant(r.reply.clone()));
        self.sessions.finish_turn(&session_id, reply).await;

        result.map_err(|e| {
            error!(session_id = %session_id, error = %e, "Error processing message");
            AgentError::ProcessingFailed
        })
    }

    async fn run(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> ragline_core::Result<AgentResponse> {
        let history = self
            .sessions
            .recent(session_id, self.settings.history_window)
            .await;

        let intent = self
            .router
            .match_query(message)
            .filter(|m| m.accepted(self.settings.confidence_threshold));

        let search = self.index.search(message, self.settings.top_k);
        let tool_run = async {
            match &intent {
                Some(m) => Some(self.tools.execute(&m.tool_name, message).await),
                None => None,
            }
        };
        let (search, tool_result) = tokio::join!(search, tool_run);
        let search = search?;

        if search.is_degraded() {
            warn!(session_id = %session_id, "Retrieval ran on fallback embeddings");
        }

        let tool_name = intent.as_ref().map(|m| m.tool_name.as_str());
        if let (Some(name), Some(result)) = (tool_name, &tool_result) {
            debug!(tool = %name, success = result.success, "Tool result");
        }

        let prompt = self.assembler.assemble(&AssemblyInput {
            excerpts: &search.results,
            tool_output: tool_name
                .zip(tool_result.as_ref())
                .map(|(tool_name, result)| ToolOutput { tool_name, result }),
            history: &history,
        });

        info!(
            session_id = %session_id,
            excerpts = prompt.metadata.excerpts,
            tool = tool_name.unwrap_or("none"),
            estimated_tokens = prompt.metadata.estimated_tokens,
            "Prompt assembled"
        );

        let reply = self.generator.generate(&prompt.text).await?;

        Ok(AgentResponse {
            reply,
            session_id: session_id.clone(),
            context_used: search.sources(),
            plugins_used: tool_name.map(|n| vec![n.to_string()]).unwrap_or_default(),
            retrieval_mode: search.query_mode,
            timestamp: Utc::now(),
        })
    }
}
