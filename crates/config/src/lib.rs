//! Configuration loading, validation, and management for Ragline.
//!
//! Loads configuration from `$RAGLINE_CONFIG` or `~/.ragline/config.toml`
//! with environment variable overrides. Validates all settings at startup.

use ragline_core::intent::IntentRule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragline/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation backend
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Embedding backend
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Document corpus ingestion
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Retrieval and history window
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Intent routing table
    #[serde(default)]
    pub intent: IntentConfig,

    /// Tool execution
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Conversation memory bounds
    #[serde(default)]
    pub sessions: SessionConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

// ── Generation ────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// "gemini", "openai", "openrouter" or "ollama"
    #[serde(default = "default_generation_provider")]
    pub provider: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_provider() -> String {
    "gemini".into()
}
fn default_generation_model() -> String {
    "gemini-2.5-pro".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_generation_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Embedding ─────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "huggingface", "openai" or "none" (fallback vectors only)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Vector length; also the length of fallback vectors
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_provider() -> String {
    "huggingface".into()
}
fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".into()
}
fn default_dimension() -> usize {
    384
}
fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: None,
            api_url: None,
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Corpus ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory of documents ingested at startup
    #[serde(default = "default_corpus_dir")]
    pub directory: PathBuf,

    /// Segmenter size cap, in characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Chunks shorter than this are not indexed
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// File extensions picked up from the directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Ingest `directory` when the server starts
    #[serde(default = "default_true")]
    pub ingest_on_start: bool,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("./sample-md-files")
}
fn default_max_chunk_size() -> usize {
    1000
}
fn default_min_chunk_chars() -> usize {
    50
}
fn default_extensions() -> Vec<String> {
    vec!["md".into(), "txt".into()]
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            directory: default_corpus_dir(),
            max_chunk_size: default_max_chunk_size(),
            min_chunk_chars: default_min_chunk_chars(),
            extensions: default_extensions(),
            ingest_on_start: true,
        }
    }
}

// ── Retrieval ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Excerpts retrieved per message
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Messages of history replayed into the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_top_k() -> usize {
    3
}
fn default_history_window() -> usize {
    2
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_window: default_history_window(),
        }
    }
}

// ── Intent ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// A tool runs only when its match confidence is strictly above this
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Ordered rule table; first rule that fires wins
    #[serde(default = "IntentRule::defaults")]
    pub rules: Vec<IntentRule>,
}

fn default_confidence_threshold() -> f32 {
    0.7
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            rules: IntentRule::defaults(),
        }
    }
}

// ── Tools ─────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Deadline for a single tool invocation
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// OpenWeatherMap key; mock data is served without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,

    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,
}

fn default_tool_timeout() -> u64 {
    10
}
fn default_weather_api_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout(),
            weather_api_key: None,
            weather_api_url: default_weather_api_url(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("timeout_secs", &self.timeout_secs)
            .field("weather_api_key", &redact(&self.weather_api_key))
            .field("weather_api_url", &self.weather_api_url)
            .finish()
    }
}

// ── Sessions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Least-recently-updated sessions are evicted past this count; 0 = unbounded
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    1_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from `$RAGLINE_CONFIG` or the default path
    /// (`~/.ragline/config.toml`), then apply environment overrides:
    /// - `GEMINI_API_KEY` / `OPENAI_API_KEY` (generation key, by provider)
    /// - `HUGGINGFACE_API_KEY` (embedding key)
    /// - `WEATHER_API_KEY`
    /// - `RAGLINE_PROVIDER`, `RAGLINE_MODEL`, `PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("RAGLINE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Values already set in
    /// the file win for secrets; provider, model and port always follow the
    /// environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("RAGLINE_PROVIDER") {
            self.generation.provider = provider;
        }
        if let Some(model) = lookup("RAGLINE_MODEL") {
            self.generation.model = model;
        }

        if self.generation.api_key.is_none() {
            self.generation.api_key = match self.generation.provider.as_str() {
                "gemini" => lookup("GEMINI_API_KEY"),
                "openrouter" => lookup("OPENROUTER_API_KEY"),
                _ => lookup("OPENAI_API_KEY"),
            };
        }

        if self.embedding.api_key.is_none() {
            self.embedding.api_key = match self.embedding.provider.as_str() {
                "openai" => lookup("OPENAI_API_KEY"),
                _ => lookup("HUGGINGFACE_API_KEY"),
            };
        }

        if self.tools.weather_api_key.is_none() {
            self.tools.weather_api_key = lookup("WEATHER_API_KEY");
        }

        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(port = %port, "Ignoring unparseable PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be > 0".into(),
            ));
        }

        if self.corpus.max_chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "corpus.max_chunk_size must be > 0".into(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }

        for (key, secs) in [
            ("generation.timeout_secs", self.generation.timeout_secs),
            ("embedding.timeout_secs", self.embedding.timeout_secs),
            ("tools.timeout_secs", self.tools.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationError(format!("{key} must be > 0")));
            }
        }

        if !(0.0..=1.0).contains(&self.intent.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "intent.confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        for rule in &self.intent.rules {
            if !(0.0..=1.0).contains(&rule.confidence) {
                return Err(ConfigError::ValidationError(format!(
                    "intent rule '{}' has confidence outside [0, 1]",
                    rule.tool
                )));
            }
            if rule.keywords.is_empty() && rule.patterns.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "intent rule '{}' needs at least one keyword or pattern",
                    rule.tool
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            embedding: EmbeddingConfig::default(),
            corpus: CorpusConfig::default(),
            retrieval: RetrievalConfig::default(),
            intent: IntentConfig::default(),
            tools: ToolsConfig::default(),
            sessions: SessionConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
