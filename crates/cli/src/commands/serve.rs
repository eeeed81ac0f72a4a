//! `ragline serve`: Ingest the corpus and start the HTTP gateway.

use std::path::PathBuf;

use ragline_config::AppConfig;

use crate::runtime::Runtime;

pub async fn run(
    port_override: Option<u16>,
    corpus_override: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(dir) = corpus_override {
        config.corpus.directory = dir;
    }

    let runtime = Runtime::build(&config)?;
    if config.corpus.ingest_on_start {
        runtime.ingest_corpus(&config.corpus.directory).await;
    }

    let orch = &runtime.orchestrator;
    println!("Ragline Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Generator:  {}", orch.generator_name());
    println!("   Chunks:     {}", orch.index().len().await);
    println!("   Tools:      {}", orch.tools().names().join(", "));

    ragline_gateway::start(runtime.orchestrator.clone(), &config.gateway).await?;

    Ok(())
}
