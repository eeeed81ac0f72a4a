//! Backend selection: builds the generation and embedding collaborators
//! named in configuration.

use std::sync::Arc;
use std::time::Duration;

use ragline_config::{AppConfig, EmbeddingConfig, GenerationConfig};
use ragline_core::error::{EmbeddingError, ProviderError};
use ragline_core::provider::{Embedder, Provider};
use tracing::info;

use crate::gemini::GeminiProvider;
use crate::huggingface::HuggingFaceEmbedder;
use crate::openai_compat::OpenAiCompatProvider;

/// Build both collaborators. The embedder is `None` when
/// `embedding.provider = "none"`; retrieval then runs on fallback vectors.
pub fn build_from_config(
    config: &AppConfig,
) -> ragline_core::Result<(Arc<dyn Provider>, Option<Arc<dyn Embedder>>)> {
    let generator = build_generator(&config.generation)?;
    let embedder = build_embedder(&config.embedding)?;
    Ok((generator, embedder))
}

/// Build the generation backend.
pub fn build_generator(config: &GenerationConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let api_key = config.api_key.clone().unwrap_or_default();

    let provider: Arc<dyn Provider> = match config.provider.as_str() {
        "gemini" => {
            let mut p = GeminiProvider::new(api_key, timeout)?
                .with_model(&config.model)
                .with_temperature(config.temperature)
                .with_max_output_tokens(config.max_tokens);
            if let Some(url) = &config.api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        name => {
            let base_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| default_base_url(name));
            let api_key = if name == "ollama" && api_key.is_empty() {
                "ollama".to_string()
            } else {
                api_key
            };
            if api_key.is_empty() {
                return Err(ProviderError::NotConfigured(format!(
                    "no API key for generation provider '{name}'"
                )));
            }
            Arc::new(
                OpenAiCompatProvider::new(name, base_url, api_key, timeout)?
                    .with_model(&config.model)
                    .with_temperature(config.temperature)
                    .with_max_tokens(config.max_tokens),
            )
        }
    };

    info!(provider = %config.provider, model = %config.model, "Generation backend ready");
    Ok(provider)
}

/// Build the embedding backend, if any.
pub fn build_embedder(
    config: &EmbeddingConfig,
) -> Result<Option<Arc<dyn Embedder>>, EmbeddingError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let embedder: Arc<dyn Embedder> = match config.provider.as_str() {
        "none" => {
            info!("No embedding backend configured, using fallback vectors");
            return Ok(None);
        }
        "huggingface" => {
            let mut e = HuggingFaceEmbedder::new(&config.model, config.api_key.clone(), timeout)?;
            if let Some(url) = &config.api_url {
                e = e.with_url(url);
            }
            Arc::new(e)
        }
        name => {
            let base_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| default_base_url(name));
            let provider = OpenAiCompatProvider::new(
                name,
                base_url,
                config.api_key.clone().unwrap_or_default(),
                timeout,
            )
            .map_err(|e| EmbeddingError::Network(e.to_string()))?
            .with_embedding_model(&config.model);
            Arc::new(provider)
        }
    };

    info!(provider = %config.provider, model = %config.model, "Embedding backend ready");
    Ok(Some(embedder))
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "http://localhost:8080/v1".into(),
    }
}
