//! Shared stub generators for orchestrator tests.

use ragline_core::error::ProviderError;
use ragline_core::provider::Provider;
use std::sync::Mutex;

/// Replies with the prompt it was given.
pub struct EchoProvider;

#[async_trait::async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        Ok(prompt.to_string())
    }
}

/// Always fails with a network error.
pub struct FailingProvider;

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Returns scripted replies in order and records every prompt.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: replies.into_iter().map(String::from).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let call = prompts.len();
        prompts.push(prompt.to_string());
        match self.replies.get(call) {
            Some(reply) => Ok(reply.clone()),
            None => panic!(
                "ScriptedProvider: no more replies (call #{call}, have {})",
                self.replies.len()
            ),
        }
    }
}
