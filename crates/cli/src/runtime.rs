//! Wiring shared by every command: one index, one session store, one tool
//! registry and one orchestrator, all built from [`AppConfig`].

use std::path::Path;
use std::sync::Arc;

use ragline_agent::{Orchestrator, OrchestratorSettings};
use ragline_config::AppConfig;
use ragline_core::error::IngestError;
use ragline_memory::{DocumentIngestor, IngestOptions, IngestReport, SemanticIndex, SessionStore};
use ragline_tools::IntentRouter;
use tracing::{info, warn};

pub struct Runtime {
    pub orchestrator: Arc<Orchestrator>,
    pub ingestor: DocumentIngestor,
}

impl Runtime {
    pub fn build(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (generator, embedder) = ragline_providers::build_from_config(config)?;
        if embedder.is_none() {
            warn!("No embedding backend configured; retrieval uses fallback vectors");
        }

        let index = Arc::new(SemanticIndex::new(config.embedding.dimension, embedder));
        let sessions = Arc::new(SessionStore::new(config.sessions.max_sessions));
        let tools = Arc::new(ragline_tools::default_registry(&config.tools)?);
        let router = IntentRouter::new(&config.intent.rules)?;

        let ingestor = DocumentIngestor::new(index.clone(), ingest_options(config));
        let orchestrator = Orchestrator::new(
            index,
            sessions,
            tools,
            router,
            generator,
            OrchestratorSettings::from(config),
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            ingestor,
        })
    }

    /// Ingest `dir`, logging the outcome. A missing directory is not fatal.
    pub async fn ingest_corpus(&self, dir: &Path) -> Option<IngestReport> {
        info!(dir = %dir.display(), "Initializing knowledge base");
        match self.ingestor.ingest_dir(dir).await {
            Ok(report) => {
                info!(
                    documents = report.documents,
                    chunks = report.chunks,
                    skipped = report.skipped,
                    failures = report.failures.len(),
                    "Knowledge base initialized"
                );
                Some(report)
            }
            Err(e @ IngestError::MissingDirectory(_)) => {
                warn!(error = %e, "Starting with an empty knowledge base");
                None
            }
            Err(e) => {
                warn!(error = %e, "Corpus ingestion failed");
                None
            }
        }
    }
}

pub fn ingest_options(config: &AppConfig) -> IngestOptions {
    IngestOptions {
        max_chunk_size: config.corpus.max_chunk_size,
        min_chunk_chars: config.corpus.min_chunk_chars,
        extensions: config.corpus.extensions.clone(),
    }
}
