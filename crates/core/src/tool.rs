//! Tool trait: the abstraction over deterministic agent capabilities.
//!
//! A tool receives the raw user query, extracts the part relevant to its
//! domain, and returns a [`ToolResult`]. Tools never fail the caller:
//! every problem (bad input, timeout, panic) becomes `success: false`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ToolError;

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Structured output on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Human-readable failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::failure(err.to_string())
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "math", "weather").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// Execute the tool against the raw query text.
    async fn execute(&self, query: &str) -> ToolResult;
}

/// A registry of available tools.
///
/// Every invocation runs on its own task under a deadline, so a hung or
/// panicking tool degrades into a failed [`ToolResult`].
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Default per-invocation deadline.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-invocation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute the named tool against `query`.
    pub async fn execute(&self, name: &str, query: &str) -> ToolResult {
        let Some(tool) = self.tools.get(name).cloned() else {
            return ToolError::NotFound(name.to_string()).into();
        };

        let owned_query = query.to_string();
        let handle = tokio::spawn(async move { tool.execute(&owned_query).await });
        let abort = handle.abort_handle();

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => {
                debug!(tool = %name, success = result.success, "Tool finished");
                result
            }
            Ok(Err(join_err)) => {
                warn!(tool = %name, error = %join_err, "Tool task failed");
                ToolError::ExecutionFailed {
                    tool_name: name.to_string(),
                    reason: format!("Failed to execute plugin '{name}'"),
                }
                .into()
            }
            Err(_) => {
                abort.abort();
                warn!(tool = %name, timeout_ms = self.timeout.as_millis() as u64, "Tool timed out");
                ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
                .into()
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
